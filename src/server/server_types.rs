use crate::{account::SaveSlot, transfer::FormFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Endpoint {
    Login,
    Signup,
    Upload,
    Download,
}

impl Endpoint {
    pub fn path(&self) -> &str {
        match self {
            Endpoint::Login => "log_in.php",
            Endpoint::Signup => "sign_up.php",
            Endpoint::Upload => "upload.php",
            Endpoint::Download => "download.php",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerCommand {
    Login,
    Signup { mail: String },
    /// Fields from the transfer encoder.
    Upload { slot: SaveSlot, fields: FormFields },
    Download { slot: SaveSlot },
}

/// The single completion message for a request. `Err` carries a status string
/// for the operator; the body is the raw response bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReply {
    pub id: u64,
    pub endpoint: Endpoint,
    pub body: Result<Vec<u8>, String>,
}
