use crate::cli::SearchType;
use crate::models::{CatalogSource, MediaTypeHint};
use crate::state::SharedState;
use tokio_util::sync::CancellationToken;

pub async fn cmd_search(
    state: &SharedState,
    query: &str,
    search_type: SearchType,
    year: Option<i32>,
) -> anyhow::Result<()> {
    let type_hint = match search_type {
        SearchType::Movie => MediaTypeHint::Movie,
        SearchType::Series => MediaTypeHint::Series,
    };
    let results = state
        .validation
        .search_manual(query, type_hint, year, &CancellationToken::new())
        .await?;

    if results.is_empty() {
        println!("no results for \"{query}\"");
        return Ok(());
    }

    println!("{} result(s) for \"{query}\"", results.len());
    for candidate in results {
        println!(
            "  {} | {} ({}) | score {:.1} | {:?}",
            candidate.external_id,
            candidate.title,
            candidate.year.map_or_else(|| "?".to_string(), |y| y.to_string()),
            candidate.score,
            candidate.source,
        );
    }
    Ok(())
}

pub async fn cmd_search_id(state: &SharedState, source: &str, external_id: &str) -> anyhow::Result<()> {
    let source = match source.to_lowercase().as_str() {
        "tmdb" => CatalogSource::Tmdb,
        "tvdb" => CatalogSource::Tvdb,
        "imdb" => CatalogSource::Imdb,
        other => anyhow::bail!("unknown catalog source \"{other}\", expected tmdb|tvdb|imdb"),
    };

    let details = state
        .validation
        .search_by_external_id(source, external_id, &CancellationToken::new())
        .await?;

    match details {
        Some(d) => {
            println!("{} ({})", d.title, d.year.map_or_else(|| "?".to_string(), |y| y.to_string()));
            if let Some(overview) = d.overview {
                println!("{overview}");
            }
        }
        None => println!("no entry found for {external_id}"),
    }
    Ok(())
}
