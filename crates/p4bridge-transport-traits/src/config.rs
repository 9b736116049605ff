//! Connection settings handed to the engine unchanged.

use serde::{Deserialize, Serialize};

/// Settings the engine needs to open a connection
///
/// This layer does not interpret any of these; they are forwarded to
/// [`Transport::init`](crate::Transport::init) as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Server address (`P4PORT`)
    pub port: Option<String>,
    /// User name (`P4USER`)
    pub user: Option<String>,
    /// Client workspace (`P4CLIENT`)
    pub client: Option<String>,
    /// Host name override (`P4HOST`)
    pub host: Option<String>,
    /// Password or ticket (`P4PASSWD`)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Character set (`P4CHARSET`)
    pub charset: Option<String>,
    /// Working directory
    pub cwd: Option<String>,
    /// Ticket file path (`P4TICKETS`)
    pub ticket_file: Option<String>,
    /// Trust file path (`P4TRUST`)
    pub trust_file: Option<String>,
    /// Program name reported to the server
    pub prog: Option<String>,
    /// Program version reported to the server
    pub version: Option<String>,
}
