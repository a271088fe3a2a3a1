//! Lua sandbox creation
//!
//! Deploy scripts are evaluated in a restricted Lua state: no `io`, `os`,
//! `debug` or `package`, and no `require`/`dofile`/`loadfile`. Scripts reach
//! shared files through `import`, which is rooted at the scripts directory
//! and evaluates each file once per state, so every importer of
//! `_context.lua` receives the very same table.
//!
//! One sandbox is created per run. Nothing loaded in it outlives the run.

use mlua::{Function, Lua, LuaOptions, Result as LuaResult, StdLib, Table, Value};
use std::path::{Component, Path, PathBuf};

use crate::module::ModuleRegistry;

/// Registry key of the `import` cache table
const IMPORT_CACHE_KEY: &str = "rocketh.imports";

/// Option fields copied by `deploy_script` into the script table
const SCRIPT_OPTIONS: [&str; 5] = ["tags", "dependencies", "skip", "run_at_the_end", "id"];

/// Create a restricted Lua sandbox for one run
///
/// # Arguments
/// * `root` - Scripts directory; `import` paths are resolved against it
/// * `modules` - Modules to register as globals (e.g. `log`)
///
/// # Example
/// ```no_run
/// use rocketh_lua::{ModuleRegistry, create_sandbox};
/// use std::path::Path;
///
/// let lua = create_sandbox(Path::new("deploy"), &ModuleRegistry::new())?;
/// let script: mlua::Table = lua
///     .load(r#"return deploy_script(import("_context.lua"), function(env) end, { tags = "token" })"#)
///     .eval()?;
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox(root: &Path, modules: &ModuleRegistry) -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::COROUTINE | StdLib::UTF8,
        LuaOptions::default(),
    )?;

    // Remove loaders that would bypass the sandbox
    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    register_import(&lua, root.to_path_buf())?;
    register_deploy_script(&lua)?;
    modules.register_all(&lua)?;

    Ok(lua)
}

/// Register `import(path)`
///
/// Evaluates `root/path` the first time it is requested and returns the
/// cached value afterwards.
fn register_import(lua: &Lua, root: PathBuf) -> LuaResult<()> {
    lua.set_named_registry_value(IMPORT_CACHE_KEY, lua.create_table()?)?;

    let import_fn = lua.create_function(move |lua, relative: String| {
        let path = root.join(normalize_import(&relative)?);
        let key = path.to_string_lossy().to_string();

        let cache: Table = lua.named_registry_value(IMPORT_CACHE_KEY)?;
        let cached: Value = cache.get(key.as_str())?;
        if !cached.is_nil() {
            return Ok(cached);
        }

        let source = std::fs::read_to_string(&path).map_err(|e| {
            mlua::Error::RuntimeError(format!("Failed to import '{}': {}", relative, e))
        })?;
        let value: Value = lua
            .load(source)
            .set_name(format!("@{}", path.display()))
            .eval()?;

        cache.set(key.as_str(), value.clone())?;
        Ok(value)
    })?;

    lua.globals().set("import", import_fn)?;
    Ok(())
}

/// Resolves `.` and `..` in an import path without leaving the scripts root
///
/// Every spelling of one file maps to the same path, which is what the
/// `import` cache is keyed by.
fn normalize_import(relative: &str) -> LuaResult<PathBuf> {
    let escapes = || {
        mlua::Error::RuntimeError(format!(
            "Failed to import '{}': path leaves the scripts directory",
            relative
        ))
    };

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop().ok_or_else(escapes)?;
            }
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }
    Ok(parts.iter().collect())
}

/// Register `deploy_script(context, func, options)`
///
/// Builds the script table the registry expects, so scripts do not have to
/// spell out field names by hand.
fn register_deploy_script(lua: &Lua) -> LuaResult<()> {
    let deploy_script_fn = lua.create_function(
        |lua, (context, func, options): (Value, Function, Option<Table>)| {
            let script = lua.create_table()?;
            script.set("provided_context", context)?;
            script.set("func", func)?;

            if let Some(options) = options {
                for key in SCRIPT_OPTIONS {
                    let value: Value = options.get(key)?;
                    script.set(key, value)?;
                }
            }

            Ok(script)
        },
    )?;

    lua.globals().set("deploy_script", deploy_script_fn)?;
    Ok(())
}

/// Lua Language Server stubs for the sandbox globals and the `env` argument
pub fn core_stubs() -> &'static str {
    r#"---@meta

---@class Transaction
---@field hash string
---@field origin string
---@field nonce? string

---@class Receipt
---@field blockNumber integer
---@field blockHash string
---@field gasUsed integer

---@class Deployment
---@field address string
---@field abi table
---@field bytecode string
---@field argsData string
---@field transaction Transaction
---@field receipt Receipt

---@class PendingDeployment
---@field partialDeployment {abi: table, bytecode: string, argsData: string}
---@field transaction Transaction

---@class Network
---@field name string
---@field chain_id string
---@field request fun(method: string, params?: any[]): any

---@class Environment
---@field accounts table<string, string> Named accounts resolved to addresses
---@field network Network
env = {}

---Returns the finalized deployment stored under `name`, or nil
---@param name string
---@return Deployment?
function env.get(name) end

---Looks up an artifact by name
---@param name string
---@return {abi: table, bytecode: string}
function env.artifact(name) end

---Persists a pending deployment, waits for its transaction and returns the final deployment
---@param name string
---@param pending PendingDeployment
---@return Deployment
function env.save_while_pending(name, pending) end

---Persists a finalized deployment
---@param name string
---@param deployment Deployment
function env.save(name, deployment) end

---Deploys an artifact and waits for the deployment to be confirmed
---@param name string
---@param options {account: string, artifact: string, argsData?: string, value?: string, gas?: string}
---@return Deployment
function env.deploy(name, options) end

---Sends a transaction to a deployed contract and returns its hash
---@param name string
---@param options {account: string, data: string, value?: string, gas?: string}
---@return string
function env.execute(name, options) end

---Evaluates a file relative to the scripts directory, once per run
---@param path string
---@return any
function import(path) end

---Declares a deploy script
---@param context table Shared context, usually `import("_context.lua")`
---@param func fun(env: Environment, args: any): any
---@param options? {tags?: string|string[], dependencies?: string[], skip?: fun(env: Environment, args: any): boolean, run_at_the_end?: boolean, id?: string}
---@return table
function deploy_script(context, func, options) end
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sandbox(root: &Path) -> Lua {
        create_sandbox(root, &ModuleRegistry::new()).unwrap()
    }

    #[test]
    fn test_sandbox_basic_lua() {
        let lua = sandbox(Path::new("."));

        let result: i32 = lua
            .load(
                r#"
                local t = {a = 1, b = 2}
                return t.a + t.b
            "#,
            )
            .eval()
            .unwrap();
        assert_eq!(result, 3);

        let result: String = lua.load(r#"return string.upper("hello")"#).eval().unwrap();
        assert_eq!(result, "HELLO");
    }

    #[test]
    fn test_sandbox_no_io() {
        let lua = sandbox(Path::new("."));

        let has_io: bool = lua.load(r#"return io ~= nil"#).eval().unwrap();
        assert!(!has_io);

        let has_os: bool = lua.load(r#"return os ~= nil"#).eval().unwrap();
        assert!(!has_os);
    }

    #[test]
    fn test_sandbox_no_require() {
        let lua = sandbox(Path::new("."));

        assert!(lua.load(r#"require("os")"#).exec().is_err());
        assert!(lua.load(r#"dofile("x.lua")"#).exec().is_err());
    }

    #[test]
    fn test_import_returns_same_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_context.lua"), "return { accounts = {} }").unwrap();
        let lua = sandbox(dir.path());

        let same: bool = lua
            .load(r#"return import("_context.lua") == import("_context.lua")"#)
            .eval()
            .unwrap();
        assert!(same);
    }

    #[test]
    fn test_import_normalizes_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("_context.lua"), "return { accounts = {} }").unwrap();
        let lua = sandbox(dir.path());

        let same: bool = lua
            .load(
                r#"
                local ctx = import("_context.lua")
                return ctx == import("./_context.lua") and ctx == import("lib/../_context.lua")
            "#,
            )
            .eval()
            .unwrap();
        assert!(same);
    }

    #[test]
    fn test_import_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("deploy");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret.lua"), "return 1").unwrap();
        let lua = sandbox(&root);

        for path in ["../secret.lua", "lib/../../secret.lua", "/etc/hosts"] {
            let err = lua
                .load(format!("return import({:?})", path))
                .eval::<Value>()
                .unwrap_err();
            assert!(err.to_string().contains("leaves the scripts directory"), "{}", path);
        }
    }

    #[test]
    fn test_normalize_import() {
        assert_eq!(normalize_import("./a/./b/../c.lua").unwrap(), PathBuf::from("a/c.lua"));
        assert_eq!(normalize_import("_context.lua").unwrap(), PathBuf::from("_context.lua"));
        assert!(normalize_import("..").is_err());
    }

    #[test]
    fn test_import_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let lua = sandbox(dir.path());

        let err = lua
            .load(r#"return import("_missing.lua")"#)
            .eval::<Value>()
            .unwrap_err();
        assert!(err.to_string().contains("_missing.lua"));
    }

    #[test]
    fn test_deploy_script_builds_table() {
        let lua = sandbox(Path::new("."));

        let script: Table = lua
            .load(
                r#"
                local ctx = {}
                local s = deploy_script(ctx, function(env, args) return true end, {
                    tags = {"token"},
                    dependencies = {"registry"},
                    run_at_the_end = true,
                    unknown = 1,
                })
                s.same_context = s.provided_context == ctx
                return s
            "#,
            )
            .eval()
            .unwrap();

        assert!(script.get::<bool>("same_context").unwrap());
        assert!(script.get::<Function>("func").is_ok());
        assert!(script.get::<bool>("run_at_the_end").unwrap());
        assert!(script.get::<Value>("unknown").unwrap().is_nil());
    }

    #[test]
    fn test_core_stubs() {
        let stubs = core_stubs();
        assert!(stubs.starts_with("---@meta"));
        assert!(stubs.contains("function deploy_script"));
        assert!(stubs.contains("function env.save_while_pending"));
    }
}
