//! Profiles for talking to payment servers.
//!
//! Profiles live in `~/.lptools/config.toml` and pair a server URL with the bearer token to use
//! against it. The file is created with owner-only permissions on first use and is meant to be
//! edited by hand; tokens themselves come from `lptools token`.

use std::{
    fs,
    io,
    io::{Error, ErrorKind},
    path::PathBuf,
};

use anyhow::anyhow;
use dirs::home_dir;
use laundry_payment_engine::db_types::Role;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize, Deserialize, Default)]
pub struct UserData {
    pub profiles: Vec<Profile>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Profile {
    pub name: String,
    pub server: Url,
    /// The customer id this profile acts for. Informational; the token is what the server trusts.
    pub customer_id: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub access_token: Option<String>,
    /// Name of an environment variable holding the token, for operators who do not want tokens
    /// on disk.
    pub access_token_envar: Option<String>,
}

impl Profile {
    pub fn access_token(&self) -> Option<String> {
        self.access_token.clone().or_else(|| {
            self.access_token_envar.as_ref().and_then(|envar| {
                let token = std::env::var(envar).ok();
                if token.is_none() {
                    warn!("Envar {envar} for profile {} is not set", self.name);
                }
                token
            })
        })
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            name: "default".to_string(),
            server: Url::parse("http://localhost:4460").unwrap(),
            customer_id: String::default(),
            email: String::default(),
            roles: vec![Role::User],
            access_token: None,
            access_token_envar: None,
        }
    }
}

pub fn get_config_path() -> io::Result<PathBuf> {
    let home = home_dir().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?;
    let config_dir = home.join(".lptools");
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
        set_permissions(&config_dir, 0o700)?;
    }
    let config_file = config_dir.join("config.toml");
    if !config_file.exists() {
        info!("Creating default config file");
        let default_config = UserData { profiles: vec![Profile::default()] };
        let config_str =
            toml::to_string(&default_config).map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
        fs::write(&config_file, config_str)?;
        set_permissions(&config_file, 0o600)?;
    }
    Ok(config_dir.join("config.toml"))
}

fn set_permissions(config_dir: &PathBuf, perms: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(config_dir)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(perms); // Sets the file to only be accessible by the owner
        fs::set_permissions(config_dir, permissions)?;
    }
    Ok(())
}

pub fn read_config() -> io::Result<UserData> {
    let config_path = get_config_path()?;
    let config_str = fs::read_to_string(config_path)?;
    let config: UserData =
        toml::from_str(&config_str).map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
    Ok(config)
}

pub fn write_config(config: &UserData) -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    let config_str = toml::to_string(config)?;
    fs::write(config_path, config_str)?;
    Ok(())
}

pub fn load_profile(name: &str) -> anyhow::Result<Profile> {
    let config = read_config()?;
    config
        .profiles
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| anyhow!("No profile named '{name}' in the config file. Add one, or pass --server"))
}
