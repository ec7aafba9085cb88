#![allow(unused_imports)]
#![allow(unused_doc_comments)]

use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use roi_trainer::{appconfig::AppSettings, logging, ui::app::App, vision::NullDetector};

const SETTINGS_PATH: &str = "roi_trainer.toml";
const REPLY_WAIT: Duration = Duration::from_secs(300);

const USAGE: &str = "usage:
  roi_trainer login USER PASS
  roi_trainer signup USER PASS MAIL
  roi_trainer download USER PASS SLOT OUT";

fn main() -> Result<()> {
    let settings = AppSettings::load(SETTINGS_PATH)?;
    let _guard = logging::init_logs(&settings.log)?;
    debug!("settings: {:?}", settings);

    if !std::path::Path::new(SETTINGS_PATH).exists() {
        settings.save_to_file(SETTINGS_PATH)?;
        info!("wrote default settings to {}", SETTINGS_PATH);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let mut app = App::new(settings, NullDetector)?;

    match args.as_slice() {
        ["login", user, pass] => {
            login(&mut app, user, pass)?;
            let session = app
                .session
                .as_ref()
                .ok_or_else(|| anyhow!("login failed"))?;
            let slots: Vec<String> = session.existing_slots().map(|s| s.to_string()).collect();
            println!("saved slots: [{}]", slots.join(", "));
        }
        ["signup", user, pass, mail] => {
            app.signup(user, pass, mail)?;
            wait(&mut app)?;
        }
        ["download", user, pass, slot, out] => {
            let slot: u8 = slot
                .parse()
                .with_context(|| format!("Invalid slot: {}", slot))?;
            login(&mut app, user, pass)?;
            ensure!(app.session.is_some(), "login failed");

            app.load_record(slot)?;
            wait(&mut app)?;

            let file = app
                .detector_file
                .as_ref()
                .ok_or_else(|| anyhow!("No detector file received"))?;
            std::fs::write(out, file).with_context(|| format!("Failed to write {}", out))?;
            info!("wrote {} bytes to {}", file.len(), out);
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Invalid arguments");
        }
    }

    Ok(())
}

fn login(app: &mut App<NullDetector>, user: &str, pass: &str) -> Result<()> {
    app.login(user, pass)?;
    wait(app)
}

/// Waits for one reply and prints the notices it produced.
fn wait(app: &mut App<NullDetector>) -> Result<()> {
    app.wait_reply(REPLY_WAIT)?;
    for notice in app.take_notices() {
        println!("{}", notice);
    }
    Ok(())
}
