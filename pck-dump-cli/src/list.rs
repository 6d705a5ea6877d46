use crate::{ListCommand, load_catalog};

pub fn list(cmd: &ListCommand) -> anyhow::Result<()> {
    let catalog = load_catalog(&cmd.manifest)?;

    if cmd.json {
        serde_json::to_writer_pretty(std::io::stdout().lock(), catalog.entries())?;
        println!();
        return Ok(());
    }

    println!("Pack: {}", catalog.pack_path().display());
    for entry in catalog.entries() {
        let mut marks = String::new();
        if entry.is_encrypted() {
            marks.push_str(" [encrypted]");
        }
        if entry.is_removed() {
            marks.push_str(" [removed]");
        }
        println!("{:>12}  {}  {}{}", entry.size(), entry.md5_hex(), entry.path(), marks);
    }
    println!("{} files", catalog.file_count());

    Ok(())
}
