use chainplace_placement::ResumeOutcome;

use super::{load_engine, report};

/// Resume after the adopted candidate was rejected downstream.
pub fn next(config: &str, graph: &str, format: &str) -> anyhow::Result<()> {
    let (config, engine) = load_engine(config, graph)?;

    match engine.resume(&config.inputs.ranking)? {
        ResumeOutcome::Adopted(candidate) => match format {
            "json" => println!("{}", serde_json::to_string_pretty(&candidate)?),
            _ => println!("{}", report::format_candidate(engine.graph(), engine.bounds(), &candidate)),
        },
        ResumeOutcome::Exhausted => {
            anyhow::bail!(
                "every ranked candidate in {} has been attempted",
                config.inputs.ranking.display()
            );
        }
    }

    Ok(())
}
