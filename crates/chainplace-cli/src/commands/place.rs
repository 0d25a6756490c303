use chainplace_placement::{Policy, SearchOutcome};

use super::{load_engine, report};

pub fn place(config: &str, graph: &str, mode: u8, format: &str) -> anyhow::Result<()> {
    let policy = Policy::from_mode(mode)?;
    let (config, engine) = load_engine(config, graph)?;

    let outcome = engine.place_and_persist(policy, &config.inputs.ranking)?;
    let SearchOutcome::Found(ranking) = &outcome else {
        anyhow::bail!("no feasible placement under policy {policy}; relax the rate bounds or add cores");
    };
    let Some(best) = ranking.best() else {
        anyhow::bail!("search returned an empty ranking");
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(best)?);
        }
        _ => {
            println!("{}", report::format_candidate(engine.graph(), engine.bounds(), best));
            println!(
                "{} candidates ranked, written to {}",
                ranking.len(),
                config.inputs.ranking.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::write_inputs;

    #[test]
    fn place_writes_the_ranking_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = write_inputs(dir.path(), 6);
        place(&config, &graph, 0, "text").unwrap();
        let ranking = std::fs::read_to_string(dir.path().join("pattern.txt")).unwrap();
        assert_eq!(ranking.lines().count(), 2, "one row per pattern:\n{ranking}");
        assert!(ranking.lines().next().unwrap().contains("\t1\t1\t"));
    }

    #[test]
    fn place_rejects_unknown_mode() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = write_inputs(dir.path(), 6);
        assert!(place(&config, &graph, 6, "text").is_err());
    }

    #[test]
    fn infeasible_search_is_an_error_for_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        // Two cores, both reserved.
        let (config, graph) = write_inputs(dir.path(), 2);
        let err = place(&config, &graph, 0, "json").unwrap_err();
        assert!(err.to_string().contains("no feasible placement"), "{err}");
        assert!(!dir.path().join("pattern.txt").exists());
    }
}
