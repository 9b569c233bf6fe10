//! Shared routines emitted once at the top of every program.
//!
//! `@TAG@` is replaced with [`jtrace_core::LOG_TAG`] when rendered.

/// Entries dumped from maps and bundles before eliding the rest.
pub(crate) const CONTAINER_DUMP_LIMIT: usize = 50;

/// Fields dumped by the reflective object printer.
pub(crate) const FIELD_DUMP_LIMIT: usize = 20;

pub(crate) fn render() -> String {
    HELPERS
        .replace("@TAG@", jtrace_core::LOG_TAG)
        .replace("@CONTAINER_LIMIT@", &CONTAINER_DUMP_LIMIT.to_string())
        .replace("@FIELD_LIMIT@", &FIELD_DUMP_LIMIT.to_string())
}

const HELPERS: &str = r#"    function safeToString(obj, opts) {
      try {
        if (obj === null || obj === undefined) return 'null';
        if (typeof obj === 'string') return obj;
        if (typeof obj === 'number' || typeof obj === 'boolean') return String(obj);
        if (obj.$className) {
          var cn = obj.$className;
          if (cn === '[B' || cn === 'byte[]') return byteArrayToString(obj);
          if (cn.indexOf('[]') !== -1 || cn.charAt(0) === '[') return arrayToString(obj);
          if (isInstance('android.os.Bundle', obj)) return bundleToString(obj);
          if (isInstance('android.content.Intent', obj)) return intentToString(obj);
          if (isInstance('java.util.Map', obj)) return mapToString(obj);
          if (isInstance('java.util.Collection', obj)) return collectionToString(obj);
          return objectToString(obj, opts);
        }
        return String(obj);
      } catch (e) {
        return '<error:' + e + '>';
      }
    }
    function formatArgs(args, opts) {
      if (!opts || !opts.logArgs) return '';
      var out = [];
      for (var i = 0; i < args.length; i++) {
        out.push('arg' + i + '=' + safeToString(args[i], opts));
      }
      return out.join(', ');
    }
    function formatCall(methodSig, args, opts, threadName) {
      var argsText = formatArgs(args, opts);
      var call = methodSig;
      if (argsText) { call += ' { ' + argsText + ' }'; }
      if (threadName) { call += ' [thread=' + threadName + ']'; }
      return call;
    }
    function isInstance(className, obj) {
      try {
        return Java.use(className).class.isInstance(obj);
      } catch (e) { return false; }
    }
    function collectionToString(obj) {
      try { return obj.toString(); } catch (e) { return '<collection>'; }
    }
    function mapToString(obj) {
      try {
        var entries = obj.entrySet().toArray();
        var out = [];
        var limit = Math.min(entries.length, @CONTAINER_LIMIT@);
        for (var i = 0; i < limit; i++) {
          var e = entries[i];
          out.push(safeToString(e.getKey(), null) + '=' + safeToString(e.getValue(), null));
        }
        if (entries.length > limit) { out.push('...'); }
        return '{' + out.join(', ') + '}';
      } catch (e) { return '<map>'; }
    }
    function bundleToString(obj) {
      try {
        var keys = obj.keySet().toArray();
        var out = [];
        var limit = Math.min(keys.length, @CONTAINER_LIMIT@);
        for (var i = 0; i < limit; i++) {
          var k = keys[i];
          out.push(k + '=' + safeToString(obj.get(k), null));
        }
        if (keys.length > limit) { out.push('...'); }
        return 'Bundle{' + out.join(', ') + '}';
      } catch (e) { return '<bundle>'; }
    }
    function intentToString(obj) {
      try {
        var out = [];
        out.push('action=' + obj.getAction());
        out.push('data=' + obj.getDataString());
        try { var extras = obj.getExtras(); if (extras) { out.push('extras=' + bundleToString(extras)); } } catch (e) {}
        return 'Intent{' + out.join(', ') + '}';
      } catch (e) { return '<intent>'; }
    }
    function arrayToString(obj) {
      try {
        var Arrays = Java.use('java.util.Arrays');
        var cls = obj.getClass();
        if (cls.isArray() && !cls.getComponentType().isPrimitive()) {
          return Arrays.deepToString(obj);
        }
        return Arrays.toString(obj);
      } catch (e) { return '<array>'; }
    }
    function byteArrayToString(obj) {
      try {
        return Java.use('android.util.Base64').encodeToString(obj, 0);
      } catch (e) {
        try {
          return Java.use('java.util.Arrays').toString(obj);
        } catch (e2) { return '<byte[]>'; }
      }
    }
    function getStackTrace() {
      try {
        var Exception = Java.use('java.lang.Exception');
        return Java.use('android.util.Log').getStackTraceString(Exception.$new());
      } catch (e) { return '<stack unavailable: ' + e + '>'; }
    }
    function objectToString(obj, opts) {
      try {
        var cls = obj.getClass();
        var name = cls.getName();
        var id = 0;
        try { id = Java.use('java.lang.System').identityHashCode(obj); } catch (e) {}
        if (!opts || !opts.prettyPrint) {
          return id ? (name + '@' + id) : name;
        }
        try {
          var s = obj.toString();
          if (s && s !== '[object Object]') return s;
        } catch (e2) {}
        try {
          var fields = cls.getDeclaredFields();
          var out = [];
          var limit = Math.min(fields.length, @FIELD_LIMIT@);
          for (var i = 0; i < limit; i++) {
            var f = fields[i];
            try {
              f.setAccessible(true);
              out.push(f.getName() + '=' + safeToString(f.get(obj), null));
            } catch (e3) {}
          }
          if (fields.length > limit) { out.push('...'); }
          if (out.length > 0) return name + '{' + out.join(', ') + '}';
        } catch (e4) {}
        return id ? (name + '@' + id) : name;
      } catch (e) {
        try { return obj.toString(); } catch (e2) { return '<object>'; }
      }
    }
    function mapFromObject(obj) {
      try {
        var map = Java.use('java.util.HashMap').$new();
        for (var k in obj) {
          if (!obj.hasOwnProperty(k)) continue;
          map.put(k, obj[k]);
        }
        return map;
      } catch (e) { return obj; }
    }
    function listFromArray(arr) {
      try {
        var list = Java.use('java.util.ArrayList').$new();
        for (var i = 0; i < arr.length; i++) { list.add(arr[i]); }
        return list;
      } catch (e) { return arr; }
    }
    function boxed(className, val) {
      return Java.use(className).valueOf(String(val));
    }
    function castReturn(val, returnType) {
      try {
        if (returnType === 'void') return;
        if (val === null || val === undefined) return null;
        if (returnType.endsWith('[]') && Array.isArray(val)) {
          var comp = returnType.substring(0, returnType.length - 2);
          try { return Java.array(comp, val); } catch (e) { return val; }
        }
        switch (returnType) {
          case 'boolean': return !!val;
          case 'byte':
          case 'short':
          case 'int': return parseInt(val);
          case 'char':
            if (typeof val === 'string' && val.length > 0) return val.charCodeAt(0);
            return parseInt(val);
          case 'long': return boxed('java.lang.Long', val);
          case 'float':
          case 'double': return parseFloat(val);
          case 'java.lang.String':
          case 'String': return String(val);
          case 'java.lang.Boolean':
          case 'java.lang.Integer':
          case 'java.lang.Long':
          case 'java.lang.Short':
          case 'java.lang.Byte':
          case 'java.lang.Float':
          case 'java.lang.Double':
          case 'java.lang.Character':
            return boxed(returnType, val);
          default:
            if (returnType.indexOf('java.util.Map') === 0 && typeof val === 'object' && !Array.isArray(val)) {
              return mapFromObject(val);
            }
            if ((returnType.indexOf('java.util.List') === 0 || returnType.indexOf('java.util.Collection') === 0 || returnType.indexOf('java.util.Set') === 0)
                && Array.isArray(val)) {
              return listFromArray(val);
            }
            return val;
        }
      } catch (e) { return val; }
    }
    function evalPatch(body, ret, args, thiz) {
      var fn = new Function('ret', 'args', 'thiz', 'Java', 'send', 'console', body);
      return fn(ret, args, thiz, Java, send, console);
    }
    function applyPatch(ret, args, thiz, patch) {
      if (!patch || !patch.enabled) return ret;
      try {
        switch (patch.mode) {
          case 'CONSTANT':
            return patch.constValue;
          case 'EXPRESSION':
            return evalPatch(patch.expr, ret, args, thiz);
          case 'CONDITIONAL':
            if (evalPatch('return (' + patch.cond + ');', ret, args, thiz)) {
              return evalPatch('return (' + patch.thenValue + ');', ret, args, thiz);
            }
            if (patch.elseValue && patch.elseValue.trim() !== '') {
              return evalPatch('return (' + patch.elseValue + ');', ret, args, thiz);
            }
            return ret;
          case 'SCRIPT':
            var out = evalPatch(patch.script, ret, args, thiz);
            return out === undefined ? ret : out;
          default:
            return ret;
        }
      } catch (e) {
        console.log('@TAG@ Patch error: ' + e);
        return ret;
      }
    }
"#;
