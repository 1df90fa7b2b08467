//! Commands every warden registry carries.
//!
//! `version`, `get-pid`, and `list-capabilities` let clients probe the service
//! even when it is poisoned or owned by another user. The capability answers
//! are computed once from the frozen registry.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

use crate::dispatch::{
    ClientSession, CommandDefinition, CommandError, CommandFlag, CommandFlags, CommandRegistry,
    CommandRegistryBuilder, CommandValidationError, RegistryError, make_response,
};

type Capabilities = Arc<OnceCell<Vec<String>>>;

const PROBE_FLAGS: CommandFlags = CommandFlags::from_flags(&[
    CommandFlag::PoisonImmune,
    CommandFlag::AllowAnyUser,
    CommandFlag::Daemon,
]);

/// Builds a registry holding the built-in commands plus whatever `extra`
/// registers.
///
/// # Errors
///
/// Returns an error when `extra` registers a duplicate or empty name.
pub fn standard_registry<F>(extra: F) -> Result<Arc<CommandRegistry>, RegistryError>
where
    F: FnOnce(&mut CommandRegistryBuilder) -> Result<(), RegistryError>,
{
    let capabilities: Capabilities = Arc::new(OnceCell::new());
    let mut builder = CommandRegistry::builder();
    register_builtin_commands(&mut builder, &capabilities)?;
    extra(&mut builder)?;

    let registry = Arc::new(builder.build());
    capabilities.get_or_init(|| registry.capabilities());
    Ok(registry)
}

fn register_builtin_commands(
    builder: &mut CommandRegistryBuilder,
    capabilities: &Capabilities,
) -> Result<(), RegistryError> {
    let version_caps = Arc::clone(capabilities);
    builder.register(
        CommandDefinition::new("version", move |session, request| {
            version(session, request, supported(&version_caps))
        })
        .validator(validate_version)
        .flags(PROBE_FLAGS.with(CommandFlag::Client)),
    )?;

    builder.register(CommandDefinition::new("get-pid", get_pid).flags(PROBE_FLAGS))?;

    let list_caps = Arc::clone(capabilities);
    builder.register(
        CommandDefinition::new("list-capabilities", move |session, _request| {
            let mut response = make_response();
            response.insert(
                "capabilities".to_owned(),
                Value::from(supported(&list_caps).to_vec()),
            );
            session.send_reply(&Value::Object(response))?;
            Ok(())
        })
        .flags(PROBE_FLAGS.with(CommandFlag::Client)),
    )?;
    Ok(())
}

fn supported(capabilities: &Capabilities) -> &[String] {
    capabilities.get().map(Vec::as_slice).unwrap_or_default()
}

fn get_pid(session: &mut ClientSession, _request: &Value) -> Result<(), CommandError> {
    let mut response = make_response();
    response.insert("pid".to_owned(), Value::from(std::process::id()));
    session.send_reply(&Value::Object(response))?;
    Ok(())
}

/// Capability names requested in element 1 of a `version` request.
#[derive(Debug, Default, PartialEq, Eq)]
struct CapabilityQuery {
    required: Vec<String>,
    optional: Vec<String>,
}

fn validate_version(request: &Value) -> Result<(), CommandValidationError> {
    capability_query(request).map(|_| ())
}

fn capability_query(request: &Value) -> Result<CapabilityQuery, CommandValidationError> {
    let Some(argument) = request.get(1) else {
        return Ok(CapabilityQuery::default());
    };
    let object = argument.as_object().ok_or_else(|| {
        CommandValidationError::new("version: expected element 1 to be an object")
    })?;
    Ok(CapabilityQuery {
        required: capability_list(object, "required")?,
        optional: capability_list(object, "optional")?,
    })
}

fn capability_list(
    object: &Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, CommandValidationError> {
    let Some(value) = object.get(key) else {
        return Ok(Vec::new());
    };
    let invalid =
        || CommandValidationError::new(format!("version: '{key}' must be an array of strings"));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(invalid))
        .collect()
}

fn version(
    session: &mut ClientSession,
    request: &Value,
    supported: &[String],
) -> Result<(), CommandError> {
    let query = capability_query(request)?;
    let mut response = make_response();

    if request.get(1).is_some() {
        let mut answers = Map::new();
        for name in &query.optional {
            answers.insert(name.clone(), Value::Bool(supported.contains(name)));
        }
        for name in &query.required {
            let have = supported.contains(name);
            answers.insert(name.clone(), Value::Bool(have));
            if !have && !response.contains_key("error") {
                response.insert(
                    "error".to_owned(),
                    Value::from(format!(
                        "client required capability `{name}` is not supported by this server"
                    )),
                );
            }
        }
        response.insert("capabilities".to_owned(), Value::Object(answers));
    }

    session.send_reply(&Value::Object(response))?;
    Ok(())
}
