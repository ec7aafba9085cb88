use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

pub const LOGIN_SUCCESS: &str = "login success!";
pub const UPLOAD_SUCCESS: &str = "Upload Success!";

/// One of the stored training sets on the server, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SaveSlot(u8);

impl SaveSlot {
    pub fn new(n: u8, max_slots: u8) -> Result<Self> {
        ensure!(
            (1..=max_slots).contains(&n),
            "Must between 1~{}",
            max_slots
        );
        Ok(Self(n))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for SaveSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
        }
    }

    /// Form fields appended to every request.
    pub fn form_fields(&self) -> [(String, String); 2] {
        [
            ("USER".to_string(), self.user.clone()),
            ("PASS".to_string(), self.pass.clone()),
        ]
    }
}

/// A logged-in account. Created on login success, dropped on logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub credentials: Credentials,
    /// Training sets stored on the server.
    pub saves: u8,
    pub max_slots: u8,
}

impl SessionContext {
    /// Login replies are the saved-slot count as one digit followed by
    /// `login success!`.
    pub fn from_login_response(
        credentials: Credentials,
        body: &[u8],
        max_slots: u8,
    ) -> Result<Self> {
        let text = String::from_utf8_lossy(body);
        let mut chars = text.chars();

        let saves = match (chars.next(), chars.as_str()) {
            (Some(digit), rest) if rest == LOGIN_SUCCESS => digit
                .to_digit(10)
                .ok_or_else(|| anyhow!("login failed \n{}", text))?,
            _ => bail!("login failed \n{}", text),
        };

        debug!("saves = {}", saves);

        Ok(Self {
            credentials,
            saves: (saves as u8).min(max_slots),
            max_slots,
        })
    }

    /// Slot for a new training pass: the next free one, or the operator's
    /// choice once every slot is taken.
    pub fn next_save_slot(&self, choice: Option<u8>) -> Result<SaveSlot> {
        if self.saves < self.max_slots {
            return SaveSlot::new(self.saves + 1, self.max_slots);
        }
        let choice = choice.ok_or_else(|| anyhow!("All save slots used, pick one to overwrite"))?;
        SaveSlot::new(choice, self.max_slots)
    }

    /// Slots that can be downloaded.
    pub fn existing_slots(&self) -> impl Iterator<Item = SaveSlot> + '_ {
        (1..=self.saves).map(SaveSlot)
    }

    pub fn has_slot(&self, slot: SaveSlot) -> bool {
        slot.get() <= self.saves
    }

    /// Applies an upload reply and returns the message for the operator.
    pub fn record_upload(&mut self, slot: SaveSlot, body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        if text.ends_with(UPLOAD_SUCCESS) && self.saves < self.max_slots {
            self.saves += 1;
            info!("upload stored, {} slots used", self.saves);
            format!("Saving to #{}", slot)
        } else {
            text.into_owned()
        }
    }
}
