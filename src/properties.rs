//! Connection property registry.
//!
//! Connection URIs carry properties after the backend location, either as
//! `;name=value` segments or as a `?name=value` query. The registry lists
//! every recognized property with its default and allowed values, sorted by
//! name so that property listings are stable.
//!
//! ```text
//! postgres://localhost/app;readonly=true;rpcPriority=HIGH
//! └──────── backend ─────┘└──────── properties ─────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{BindError, BindResult};

const BOOLEANS: &[&str] = &["true", "false"];

/// A recognized connection property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionProperty {
    pub name: &'static str,
    pub default_value: Option<&'static str>,
    pub valid_values: Option<&'static [&'static str]>,
    pub description: &'static str,
}

const fn prop(
    name: &'static str,
    default_value: Option<&'static str>,
    valid_values: Option<&'static [&'static str]>,
    description: &'static str,
) -> ConnectionProperty {
    ConnectionProperty {
        name,
        default_value,
        valid_values,
        description,
    }
}

// Names must not contain ';', '?' or '='.
const CATALOG: &[ConnectionProperty] = &[
    prop("autocommit", Some("true"), Some(BOOLEANS), "Should the connection start in autocommit mode"),
    prop("readonly", Some("false"), Some(BOOLEANS), "Should the connection start in read-only mode"),
    prop(
        "retryAbortsInternally",
        Some("true"),
        Some(BOOLEANS),
        "Should the connection automatically retry aborted transactions",
    ),
    prop(
        "lenient",
        Some("false"),
        Some(BOOLEANS),
        "Silently ignore unknown properties in the connection string instead of failing",
    ),
    prop("credentials", None, None, "The location of the credentials file to use for this connection"),
    prop(
        "encodedCredentials",
        None,
        None,
        "Base64-encoded credentials to use for this connection",
    ),
    prop("oauthToken", None, None, "A valid pre-existing OAuth token to use for authentication"),
    prop("minSessions", Some("100"), None, "The minimum number of sessions in the backing session pool"),
    prop("maxSessions", Some("400"), None, "The maximum number of sessions in the backing session pool"),
    prop("numChannels", Some("4"), None, "The number of gRPC channels to use to communicate with the backend"),
    prop("endpoint", None, None, "The endpoint that the connection should connect to"),
    prop(
        "usePlainText",
        Some("false"),
        Some(BOOLEANS),
        "Use a plain text communication channel (i.e. non-TLS) for communicating with the server",
    ),
    prop("userAgent", None, None, "The custom user-agent property name to use when communicating with the backend"),
    prop("optimizerVersion", Some(""), None, "Sets the default query optimizer version to use for this connection"),
    prop(
        "optimizerStatisticsPackage",
        Some(""),
        None,
        "Sets the default query optimizer statistic package to use for this connection",
    ),
    prop(
        "rpcPriority",
        None,
        Some(&["HIGH", "MEDIUM", "LOW", "UNSPECIFIED"]),
        "Sets the priority for all RPC invocations from this connection",
    ),
    prop(
        "returnCommitStats",
        Some("false"),
        Some(BOOLEANS),
        "Request that the backend returns commit statistics for read/write transactions",
    ),
    prop(
        "autoConfigEmulator",
        Some("false"),
        Some(BOOLEANS),
        "Automatically configure the connection to try to connect to the emulator",
    ),
    prop("databaseRole", None, None, "Sets the database role to use for this connection"),
    prop(
        "dialect",
        Some("GOOGLE_STANDARD_SQL"),
        Some(&["GOOGLE_STANDARD_SQL", "POSTGRESQL"]),
        "Sets the dialect to use for new databases that are created by this connection",
    ),
    prop(
        "trackSessionLeaks",
        Some("true"),
        Some(BOOLEANS),
        "Capture the call stack of the thread that checked out a session of the session pool",
    ),
    prop(
        "trackConnectionLeaks",
        Some("true"),
        Some(BOOLEANS),
        "Capture the call stack of the thread that opened a connection",
    ),
    prop(
        "dataBoostEnabled",
        Some("false"),
        Some(BOOLEANS),
        "Enable data boost for all partitioned queries that are executed by this connection",
    ),
    prop(
        "autoPartitionMode",
        Some("false"),
        Some(BOOLEANS),
        "Execute all queries on this connection as partitioned queries",
    ),
    prop(
        "maxPartitions",
        Some("0"),
        None,
        "The max partitions hint value to use for partitioned queries, 0 means no hint",
    ),
    prop(
        "maxPartitionedParallelism",
        Some("1"),
        None,
        "The maximum number of partitions that will be executed in parallel for partitioned queries",
    ),
    prop(
        "delayTransactionStartUntilFirstWrite",
        Some("false"),
        Some(BOOLEANS),
        "Delay the actual start of a read/write transaction until the first write operation",
    ),
    prop(
        "keepTransactionAlive",
        Some("false"),
        Some(BOOLEANS),
        "Keep read/write transactions alive by sending keep-alive messages while idle",
    ),
    prop(
        "autoBatchDml",
        Some("false"),
        Some(BOOLEANS),
        "Automatically buffer DML statements and execute them as one batch",
    ),
    prop(
        "routeToLeader",
        Some("true"),
        Some(BOOLEANS),
        "Route read/write transactions to the leader region",
    ),
    prop(
        "enableExtendedTracing",
        Some("false"),
        Some(BOOLEANS),
        "Include the SQL text in the traces that are produced by this connection",
    ),
    prop(
        "enableApiTracing",
        Some("false"),
        Some(BOOLEANS),
        "Add traces for each backend RPC invocation",
    ),
];

static PROPERTIES: LazyLock<Vec<ConnectionProperty>> = LazyLock::new(|| {
    let mut properties = CATALOG.to_vec();
    properties.sort_by(|a, b| a.name.cmp(b.name));
    properties
});

/// Every recognized property, sorted by name.
pub fn list_properties() -> &'static [ConnectionProperty] {
    &PROPERTIES
}

/// Look up a property by name, ignoring case.
pub fn find_property(name: &str) -> Option<&'static ConnectionProperty> {
    list_properties()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Extract `name` from `uri`, or return `default`.
///
/// Matches `;name=value` or `?name=value` case-insensitively; the value runs
/// to the next `;` or the end of the URI.
pub fn parse_uri_property(uri: &str, name: &str, default: Option<&str>) -> Option<String> {
    let pattern = format!(r"(?is)(?:;|\?){}=(.*?)(?:;|$)", regex::escape(name));
    let Ok(re) = Regex::new(&pattern) else {
        return default.map(str::to_string);
    };
    match re.captures(uri).and_then(|c| c.get(1)) {
        Some(m) => Some(m.as_str().to_string()),
        None => default.map(str::to_string),
    }
}

/// The value of `name` in `uri`, falling back to the registered default.
pub fn resolve_property(uri: &str, name: &str) -> Option<String> {
    let default = find_property(name).and_then(|p| p.default_value);
    parse_uri_property(uri, name, default)
}

/// The backend location: everything before the first `;`.
pub fn strip_properties(uri: &str) -> &str {
    uri.split(';').next().unwrap_or(uri)
}

/// Names of the `;name=value` segments declared in `uri`.
pub fn declared_property_names(uri: &str) -> Vec<&str> {
    uri.split(';')
        .skip(1)
        .filter_map(|segment| segment.split('=').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// A property as presented by a driver property listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverPropertyInfo {
    pub name: String,
    pub value: Option<String>,
    pub description: String,
    pub choices: Option<Vec<String>>,
    pub required: bool,
}

pub fn to_driver_property_info(uri: &str, property: &ConnectionProperty) -> DriverPropertyInfo {
    DriverPropertyInfo {
        name: property.name.to_string(),
        value: parse_uri_property(uri, property.name, property.default_value),
        description: property.description.to_string(),
        choices: property
            .valid_values
            .map(|values| values.iter().map(|v| v.to_string()).collect()),
        required: false,
    }
}

/// Property infos for every registered property, resolved against `uri`.
pub fn driver_property_infos(uri: &str) -> Vec<DriverPropertyInfo> {
    list_properties()
        .iter()
        .map(|p| to_driver_property_info(uri, p))
        .collect()
}

/// All registered properties resolved against one connection URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperties {
    values: BTreeMap<&'static str, Option<String>>,
}

impl ResolvedProperties {
    /// Resolve every registered property from `uri`.
    ///
    /// Values outside a property's valid values are rejected. Undeclared
    /// property names are rejected unless `lenient=true`.
    pub fn resolve(uri: &str) -> BindResult<Self> {
        let mut values = BTreeMap::new();
        for property in list_properties() {
            let value = resolve_property(uri, property.name);
            if let (Some(v), Some(valid)) = (value.as_deref(), property.valid_values) {
                if !valid.iter().any(|c| c.eq_ignore_ascii_case(v)) {
                    return Err(BindError::property(
                        property.name,
                        format!("'{}' is not one of {}", v, valid.join(", ")),
                    ));
                }
            }
            values.insert(property.name, value);
        }
        let resolved = Self { values };

        let lenient = resolved.get_bool("lenient");
        for name in declared_property_names(uri) {
            if find_property(name).is_some() {
                continue;
            }
            if lenient {
                tracing::warn!(property = name, "ignoring unknown connection property");
            } else {
                return Err(BindError::property(name, "unknown connection property"));
            }
        }
        Ok(resolved)
    }

    /// The resolved value of `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        let property = find_property(name)?;
        self.values.get(property.name)?.as_deref()
    }

    /// Whether `name` resolved to `true`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn get_u64(&self, name: &str) -> BindResult<Option<u64>> {
        match self.get(name) {
            Some(v) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| BindError::property(name, format!("'{}' is not a number", v))),
            None => Ok(None),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v.as_deref()))
    }
}
