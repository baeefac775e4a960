use anyhow::Result;

pub fn execute() -> Result<()> {
    let schema = sitepipe_core::configs::pipeline::pipeline_schema()
        .map_err(|e| anyhow::anyhow!("Failed to generate schema: {}", e))?;
    println!("{}", schema);
    Ok(())
}
