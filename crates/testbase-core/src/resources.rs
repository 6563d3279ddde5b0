//! Resource-name to environment-variable mapping
//!
//! A flat lookup table so suites can address connection details by logical
//! resource name instead of hard-coding variable names.

const RESOURCE_ENV_VARS: &[(&str, &str)] = &[
    ("database_url", "TESTBASE_DATABASE_URL"),
    ("database_host", "TESTBASE_DATABASE_HOST"),
    ("database_port", "TESTBASE_DATABASE_PORT"),
    ("database_name", "TESTBASE_DATABASE_NAME"),
    ("database_user", "TESTBASE_DATABASE_USER"),
    ("database_password", "TESTBASE_DATABASE_PASSWORD"),
    ("migrations_dir", "TESTBASE_MIGRATIONS_DIR"),
    ("log_filter", "TESTBASE_LOG"),
];

/// Environment variable name for a logical resource, if the resource is known.
pub fn env_var_for(resource: &str) -> Option<&'static str> {
    RESOURCE_ENV_VARS
        .iter()
        .find(|(name, _)| *name == resource)
        .map(|(_, var)| *var)
}

/// Resolve a logical resource to its configured value from the environment.
pub fn resolve(resource: &str) -> Option<String> {
    env_var_for(resource).and_then(|var| std::env::var(var).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_resources_map_to_env_vars() {
        assert_eq!(env_var_for("database_url"), Some("TESTBASE_DATABASE_URL"));
        assert_eq!(env_var_for("log_filter"), Some("TESTBASE_LOG"));
    }

    #[test]
    fn unknown_resources_are_none() {
        assert_eq!(env_var_for("does_not_exist"), None);
        assert_eq!(resolve("does_not_exist"), None);
    }
}
