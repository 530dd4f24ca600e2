use crate::state::SharedState;

pub async fn cmd_movies_list(state: &SharedState) -> anyhow::Result<()> {
    let movies = state.store.list_all_movies().await?;
    if movies.is_empty() {
        println!("no movies in the library.");
        return Ok(());
    }
    println!("Movies ({} total)", movies.len());
    println!("{:-<70}", "");
    for movie in movies {
        println!(
            "#{} {} ({}) watched={}",
            movie.id,
            movie.title,
            movie.year.map_or_else(|| "?".to_string(), |y| y.to_string()),
            movie.watched,
        );
    }
    Ok(())
}

pub async fn cmd_movies_search(state: &SharedState, query: &str) -> anyhow::Result<()> {
    let movies = state.store.search_movies(query).await?;
    if movies.is_empty() {
        println!("no movies matching \"{query}\"");
        return Ok(());
    }
    for movie in movies {
        println!("#{} {} ({})", movie.id, movie.title, movie.year.map_or_else(|| "?".to_string(), |y| y.to_string()));
    }
    Ok(())
}

pub async fn cmd_series_list(state: &SharedState) -> anyhow::Result<()> {
    let series = state.store.list_all_series().await?;
    if series.is_empty() {
        println!("no series in the library.");
        return Ok(());
    }
    println!("Series ({} total)", series.len());
    println!("{:-<70}", "");
    for s in series {
        println!("#{} {} ({})", s.id, s.title, s.year.map_or_else(|| "?".to_string(), |y| y.to_string()));
    }
    Ok(())
}

pub async fn cmd_series_search(state: &SharedState, query: &str) -> anyhow::Result<()> {
    let series = state.store.search_series(query).await?;
    if series.is_empty() {
        println!("no series matching \"{query}\"");
        return Ok(());
    }
    for s in series {
        println!("#{} {} ({})", s.id, s.title, s.year.map_or_else(|| "?".to_string(), |y| y.to_string()));
    }
    Ok(())
}

pub async fn cmd_episodes_list(state: &SharedState, series_id: i32) -> anyhow::Result<()> {
    let Some(series) = state.store.get_series(series_id).await? else {
        println!("no series with id {series_id}");
        return Ok(());
    };
    let episodes = state.store.list_episodes_for_series(series_id).await?;
    if episodes.is_empty() {
        println!("{} has no recorded episodes.", series.title);
        return Ok(());
    }
    println!("Episodes for {} ({} total)", series.title, episodes.len());
    println!("{:-<70}", "");
    for episode in episodes {
        println!(
            "S{:02}E{:02} {} file={}",
            episode.season_number,
            episode.episode_number,
            episode.title.as_deref().unwrap_or("(untitled)"),
            episode.file_path.as_deref().unwrap_or("(none)"),
        );
    }
    Ok(())
}
