// zps/src/cli/home.rs
use clap::Args;
use zps_common::config::Config;
use zps_common::error::Result;

#[derive(Args, Debug)]
pub struct Home {}

impl Home {
    pub async fn run(&self, config: &Config) -> Result<()> {
        println!("{}", config.zps_root().display());
        Ok(())
    }
}
