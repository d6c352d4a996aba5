// zps/src/cli/config.rs
use std::env;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::Command as StdCommand;

use clap::Args;
use tracing::debug;
use zps_aio::fs::create_dir_all;
use zps_common::config::Config;
use zps_common::error::{Result, ZpsError};

#[derive(Args, Debug)]
pub struct EditConfig {}

/// Editor command line for `path`; vim-family editors get `-n` (no swap file).
fn editor_command(editor: &str, path: &Path) -> (String, Vec<String>) {
    let mut parts = editor.split_whitespace().map(str::to_string);
    let program = parts.next().unwrap_or_else(|| "vim".to_string());
    let mut args: Vec<String> = parts.collect();
    let base = Path::new(&program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.ends_with("vim") || base == "vi" {
        args.push("-n".to_string());
    }
    args.push(path.to_string_lossy().into_owned());
    (program, args)
}

impl EditConfig {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let path = config.config_path();
        create_dir_all(config.zps_root())?;
        OpenOptions::new().create(true).append(true).open(&path)?;

        let editor = env::var("EDITOR")
            .ok()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "vim".to_string());
        let (program, args) = editor_command(&editor, &path);
        debug!("Launching {} {:?}", program, args);

        let status = StdCommand::new(&program).args(&args).status().map_err(|e| {
            ZpsError::Generic(format!("failed to launch editor '{program}': {e}"))
        })?;
        if !status.success() {
            return Err(ZpsError::Generic(format!("editor exited with {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vim_family_gets_no_swap_flag() {
        let p = Path::new("/r/config.toml");
        assert_eq!(
            editor_command("nvim", p),
            ("nvim".to_string(), vec!["-n".to_string(), "/r/config.toml".to_string()])
        );
        assert_eq!(
            editor_command("/usr/bin/vim", p).1,
            vec!["-n".to_string(), "/r/config.toml".to_string()]
        );
    }

    #[test]
    fn other_editors_keep_their_arguments() {
        let p = Path::new("/r/config.toml");
        assert_eq!(
            editor_command("code --wait", p),
            (
                "code".to_string(),
                vec!["--wait".to_string(), "/r/config.toml".to_string()]
            )
        );
    }
}
