#![allow(unused_imports)]
#![allow(unused_doc_comments)]
#![allow(clippy::new_without_default)]

pub mod account;
pub mod appconfig;
pub mod logging;
pub mod server;
pub mod transfer;
pub mod ui;
pub mod vision;
