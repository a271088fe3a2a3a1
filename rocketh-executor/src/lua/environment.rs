//! The `env` table handed to script bodies and skip predicates
//!
//! Functions that talk to the node are async: the running script yields
//! while the request is in flight.

use mlua::{Lua, LuaSerdeExt, Result as LuaResult, Table, Value};
use rocketh_core::domain::deployment::{Deployment, PendingDeployment};
use std::sync::Arc;

use super::to_lua;
use crate::environment::{DeployOptions, Environment, ExecuteOptions};
use crate::error::into_lua;

/// Builds the `env` table over `environment`
pub fn create_env_table(lua: &Lua, environment: Arc<Environment>) -> LuaResult<Table> {
    let env = lua.create_table()?;

    let accounts = lua.create_table()?;
    for (name, address) in environment.accounts() {
        accounts.set(name.as_str(), address.as_str())?;
    }
    env.set("accounts", accounts)?;
    env.set("network", create_network_table(lua, environment.clone())?)?;

    let e = environment.clone();
    env.set(
        "get",
        lua.create_function(move |lua, name: String| match e.get(&name).map_err(into_lua)? {
            Some(deployment) => to_lua(lua, &deployment),
            None => Ok(Value::Nil),
        })?,
    )?;

    let e = environment.clone();
    env.set(
        "artifact",
        lua.create_function(move |lua, name: String| {
            let artifact = e.artifact(&name).map_err(into_lua)?;
            to_lua(lua, &artifact)
        })?,
    )?;

    let e = environment.clone();
    env.set(
        "save",
        lua.create_function(move |lua, (name, deployment): (String, Value)| {
            let deployment: Deployment = lua.from_value(deployment)?;
            e.save(&name, deployment).map_err(into_lua)
        })?,
    )?;

    let e = environment.clone();
    env.set(
        "save_while_pending",
        lua.create_async_function(move |lua, (name, pending): (String, Value)| {
            let e = e.clone();
            async move {
                let pending: PendingDeployment = lua.from_value(pending)?;
                let deployment = e
                    .save_while_pending(&name, pending)
                    .await
                    .map_err(into_lua)?;
                to_lua(&lua, &deployment)
            }
        })?,
    )?;

    let e = environment.clone();
    env.set(
        "deploy",
        lua.create_async_function(move |lua, (name, options): (String, Value)| {
            let e = e.clone();
            async move {
                let options: DeployOptions = lua.from_value(options)?;
                let deployment = e.deploy(&name, options).await.map_err(into_lua)?;
                to_lua(&lua, &deployment)
            }
        })?,
    )?;

    let e = environment;
    env.set(
        "execute",
        lua.create_async_function(move |lua, (name, options): (String, Value)| {
            let e = e.clone();
            async move {
                let options: ExecuteOptions = lua.from_value(options)?;
                e.execute(&name, options).await.map_err(into_lua)
            }
        })?,
    )?;

    Ok(env)
}

/// `env.network`: name, chain id and raw JSON-RPC access
fn create_network_table(lua: &Lua, environment: Arc<Environment>) -> LuaResult<Table> {
    let network = lua.create_table()?;
    network.set("name", environment.network().name.as_str())?;
    network.set("chain_id", environment.network().chain_id.as_str())?;

    network.set(
        "request",
        lua.create_async_function(move |lua, (method, params): (String, Option<Value>)| {
            let e = environment.clone();
            async move {
                let params = match params {
                    None => serde_json::json!([]),
                    Some(params) => match lua.from_value::<serde_json::Value>(params)? {
                        // an empty Lua table reads as an empty object
                        serde_json::Value::Object(map) if map.is_empty() => serde_json::json!([]),
                        params => params,
                    },
                };
                let result = e
                    .provider()
                    .request(&method, params)
                    .await
                    .map_err(mlua::Error::external)?;
                to_lua(&lua, &result)
            }
        })?,
    )?;

    Ok(network)
}
