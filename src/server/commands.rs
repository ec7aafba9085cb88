use super::server_types::{Endpoint, ServerCommand};
use crate::{account::Credentials, transfer::FormFields};

impl ServerCommand {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ServerCommand::Login => Endpoint::Login,
            ServerCommand::Signup { .. } => Endpoint::Signup,
            ServerCommand::Upload { .. } => Endpoint::Upload,
            ServerCommand::Download { .. } => Endpoint::Download,
        }
    }

    /// Request body, with the credentials appended last.
    pub fn into_form(self, credentials: &Credentials) -> FormFields {
        let mut fields = match self {
            ServerCommand::Login => vec![],
            ServerCommand::Signup { mail } => vec![("MAIL".to_string(), mail)],
            ServerCommand::Upload { fields, .. } => fields,
            ServerCommand::Download { slot } => vec![("NUM".to_string(), slot.to_string())],
        };
        fields.extend(credentials.form_fields());
        fields
    }
}
