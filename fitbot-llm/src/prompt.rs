use std::{env, fs, path::Path};

use tracing::{info, warn};

use fitbot_core::prompt::DEFAULT_COACH_PERSONA;

const DEFAULT_PROMPT_FILE: &str = "SYSTEM_PROMPT.md";

/// Coach persona from `SYSTEM_PROMPT_FILE` (or `SYSTEM_PROMPT.md`), falling back to the built-in one.
pub fn coach_persona() -> String {
    let path = env::var("SYSTEM_PROMPT_FILE")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_PROMPT_FILE.to_owned());

    persona_from_file(Path::new(&path))
}

pub fn persona_from_file(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(value) if !value.trim().is_empty() => {
            info!(path = %path.display(), "loaded coach persona");
            value.trim().to_owned()
        }
        Ok(_) => {
            warn!(path = %path.display(), "persona file is empty; using built-in persona");
            DEFAULT_COACH_PERSONA.to_owned()
        }
        Err(_) => DEFAULT_COACH_PERSONA.to_owned(),
    }
}
