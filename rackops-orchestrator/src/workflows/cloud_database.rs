use super::{Outcome, Session};
use crate::poller::{wait_until_settled, WaitSpec};
use rackops_common::validate::check_volume_size;
use rackops_common::{DbUser, RackopsError};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Memory sizes (MB) offered by the database flavors.
pub const MEMORY_SIZES: [u32; 6] = [512, 1024, 2048, 4096, 8192, 16384];

const PASSWORD_LEN: usize = 10;

#[derive(Clone, Debug)]
pub struct DatabaseOptions {
    pub instance: String,
    pub memory_mb: u32,
    pub volume_gb: u32,
    pub db_name: String,
    pub username: String,
    /// Generated when not given.
    pub password: Option<String>,
    pub host: String,
}

impl DatabaseOptions {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            memory_mb: 512,
            volume_gb: 1,
            db_name: "mydb".to_string(),
            username: "dbuser".to_string(),
            password: None,
            host: "%".to_string(),
        }
    }
}

pub fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Create a database instance, then a database and a user granted on it.
pub async fn run(session: &mut Session, opts: &DatabaseOptions) -> Result<Outcome, RackopsError> {
    if !MEMORY_SIZES.contains(&opts.memory_mb) {
        return Err(RackopsError::InvalidInput(format!(
            "memory must be one of {:?} MB",
            MEMORY_SIZES
        )));
    }
    let volume_gb = check_volume_size(opts.volume_gb)?;
    let password = opts.password.clone().unwrap_or_else(random_password);

    let Session {
        cloud,
        intervals,
        console,
    } = session;
    let databases = cloud.databases.as_ref();

    let flavor = databases
        .list_flavors()
        .await?
        .into_iter()
        .find(|f| f.ram_mb == opts.memory_mb)
        .ok_or_else(|| RackopsError::not_found("database flavor", format!("{} MB", opts.memory_mb)))?;

    console.line(format!("INFO: Creating instance '{}'", opts.instance));
    let requested = databases
        .create_instance(&opts.instance, &flavor, volume_gb)
        .await?;
    let instance = wait_until_settled(
        &WaitSpec::database_build(intervals),
        &requested.id,
        console,
        || databases.get_instance(&requested.id),
    )
    .await?;
    if !instance.status.is_active() {
        return Err(RackopsError::BuildFailed {
            kind: "database instance",
            name: instance.name,
            status: instance.status,
        });
    }
    console.line("INFO: Instance successfully created");

    databases.create_database(&instance.id, &opts.db_name).await?;
    databases
        .create_user(
            &instance.id,
            &DbUser {
                name: opts.username.clone(),
                password: password.clone(),
                host: opts.host.clone(),
                databases: vec![opts.db_name.clone()],
            },
        )
        .await?;
    tracing::info!(
        "database {} and user {} created on instance {}",
        opts.db_name,
        opts.username,
        instance.id
    );

    console.line("-- Details:");
    console.line(format!(
        "\tDB Host: {}",
        instance.hostname.as_deref().unwrap_or("(pending)")
    ));
    console.line(format!("\tDB Name: {}", opts.db_name));
    console.line(format!("\tDB User: {}", opts.username));
    console.line(format!("\tDB Password: {}", password));
    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_passwords_are_alphanumeric() {
        let p = random_password();
        assert_eq!(p.len(), PASSWORD_LEN);
        assert!(p.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(p, random_password());
    }
}
