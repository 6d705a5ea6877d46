use pck_dump_core::{DumpError, PckDumper, VerifyOutcome};

use crate::{VerifyCommand, load_catalog, open_container};

pub fn verify(cmd: &VerifyCommand) -> anyhow::Result<()> {
    let catalog = load_catalog(&cmd.pack.manifest)?;
    let source = open_container(&cmd.pack, &catalog)?;
    let mut dumper = PckDumper::with_pack(catalog, source);

    match dumper.verify_all() {
        Ok(VerifyOutcome::Skipped) => println!("Not a checksummed pack, nothing to verify."),
        Ok(VerifyOutcome::Verified { total }) => println!("All {} files verified.", total),
        Err(DumpError::IntegrityFailed { failed, total }) => {
            if let Some(catalog) = dumper.catalog() {
                for entry in catalog.entries().iter().filter(|e| e.hash_match() == Some(false)) {
                    println!("FAILED {}", entry.path());
                }
            }
            anyhow::bail!("Checksum failed for {} of {} files", failed, total);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
