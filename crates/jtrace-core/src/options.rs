//! Per-hook logging options.

/// What a hook logs on every invocation.
///
/// Defaults match what an analyst usually wants on first attach: arguments,
/// return value and thread name, with pretty-printed objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptOptions {
    /// Log each argument in the `CALL` line
    pub log_args: bool,
    /// Log the original return value
    pub log_return: bool,
    /// Append the calling thread name to the `CALL` line
    pub log_thread: bool,
    /// Log a Java stack trace per call
    pub print_stack: bool,
    /// Log the receiver object
    pub print_this: bool,
    /// Render objects via toString/field dump instead of identity strings
    pub pretty_print: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            log_args: true,
            log_return: true,
            log_thread: true,
            print_stack: false,
            print_this: false,
            pretty_print: true,
        }
    }
}
