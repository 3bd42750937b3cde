use std::sync::Arc;

use juristream::{SearchConfig, SearchController, SessionStatus, SessionUpdate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenv::dotenv().ok();

    let query: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.is_empty() {
        eprintln!("usage: juristream <query>");
        std::process::exit(2);
    }

    let config = SearchConfig::from_env()?;
    log::info!("🔎 Searching {} via {}", query, config.backend_url);
    let jurisdictions = config.default_jurisdictions.clone();

    let controller = Arc::new(SearchController::new(config));
    let (session, mut rx) = controller.search(query, &jurisdictions).await?;
    log::info!("📡 Session {} ({} mode)", session.id, session.mode);

    while let Some(update) = rx.recv().await {
        match update {
            SessionUpdate::Snapshot(_) => {}
            SessionUpdate::Completed(state) => {
                if let Some(single) = state.single_result() {
                    println!("\n{}\n", single.answer_text.trim());
                    println!("({} citations)", single.citations.len());
                }
                if let Some(result) = state.multi_result() {
                    for answer in &result.state_answers {
                        println!("\n== {} ==", answer.jurisdiction_code);
                        println!("{}", answer.answer_text.trim());
                    }
                    if let Some(summary) = &result.summary_text {
                        println!("\n== Summary ==\n{}", summary.trim());
                    }
                    println!("\n({} ms)", result.total_processing_time_ms);
                }
                if state.status == SessionStatus::Error {
                    eprintln!(
                        "search failed: {}",
                        state.error_message.unwrap_or_default()
                    );
                    std::process::exit(1);
                }
            }
            SessionUpdate::Failed(err) => {
                eprintln!("search failed: {}", err);
                std::process::exit(1);
            }
            SessionUpdate::Cancelled => {
                eprintln!("search cancelled");
                break;
            }
        }
    }

    Ok(())
}
