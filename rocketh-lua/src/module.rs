//! Sandbox modules
//!
//! A module adds one global table to the sandbox of a run (`log` is the
//! only built-in one). The executor decides where module side effects go by
//! choosing what it builds each module with.

use mlua::prelude::*;

/// Globals owned by the sandbox itself
pub const RESERVED_GLOBALS: [&str; 4] = ["import", "deploy_script", "env", "require"];

/// A Lua module exposed to deploy scripts as a global table
///
/// # Example
///
/// ```rust
/// use rocketh_lua::module::RockethModule;
/// use mlua::prelude::*;
///
/// struct ClockModule;
///
/// impl RockethModule for ClockModule {
///     fn id(&self) -> &'static str {
///         "clock"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let clock = lua.create_table()?;
///         clock.set("epoch", lua.create_function(|_, ()| Ok(0))?)?;
///         lua.globals().set(self.id(), clock)?;
///         Ok(())
///     }
///
///     fn stubs(&self) -> String {
///         "---@meta\n---@class clock\nclock = {}\n".to_string()
///     }
/// }
/// ```
pub trait RockethModule: Send + Sync {
    /// Name of the global table; a valid Lua identifier, not one of
    /// [`RESERVED_GLOBALS`]
    fn id(&self) -> &'static str;

    /// Sets the module's global table in `lua`
    fn register(&self, lua: &Lua) -> LuaResult<()>;

    /// Lua Language Server definitions, starting with `---@meta`
    fn stubs(&self) -> String;
}

/// Modules to install in each sandbox, in registration order
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn RockethModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module
    ///
    /// # Panics
    /// Panics if the id is taken by another module or by the sandbox
    pub fn register<M: RockethModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if RESERVED_GLOBALS.contains(&id) {
            panic!("Module id '{}' is reserved by the sandbox", id);
        }
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    /// Installs every module into `lua`
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }

    /// Stub file per module, as `(file name, content)`
    pub fn stub_files(&self) -> Vec<(String, String)> {
        self.modules
            .iter()
            .map(|m| (format!("{}.lua", m.id()), m.stubs()))
            .collect()
    }
}
