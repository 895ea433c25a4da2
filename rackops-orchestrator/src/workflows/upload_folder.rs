use super::{get_or_create_container, Outcome, Session};
use crate::upload::upload_directory;
use rackops_common::RackopsError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct UploadFolderOptions {
    pub directory: PathBuf,
    pub container: String,
}

pub async fn run(session: &mut Session, opts: &UploadFolderOptions) -> Result<Outcome, RackopsError> {
    if !opts.directory.is_dir() {
        return Err(RackopsError::InvalidInput(format!(
            "directory '{}' not found, please check the path and try again",
            opts.directory.display()
        )));
    }
    let Session { cloud, console, .. } = session;
    let store = cloud.object_store.as_ref();

    console.line("Checking if container exists...");
    let (container, existed) = get_or_create_container(store, &opts.container).await?;
    if existed {
        console.line(format!(
            "Container '{}' already exists - continuing with upload",
            container.name
        ));
    } else {
        console.line(format!("Container '{}' did not exist, created", container.name));
    }

    console.line("Beginning directory/folder upload");
    let count = upload_directory(store, &container.name, &opts.directory, console).await?;
    console.line(format!("Number of objects uploaded: {}", count));
    console.line("Upload complete");
    Ok(Outcome::Completed)
}
