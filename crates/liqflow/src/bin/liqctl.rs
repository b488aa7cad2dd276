use std::env;
use std::sync::Arc;

use liqflow::config::Config;
use liqflow::dispatch::{stdin_lines, ChannelState, Coordinator, LineConfirm, Lines, LogNotifier};
use liqflow::http::make_client;
use liqflow::jobs::{EmailDraft, HttpJobsApi, JobStatus, JobsApi};
use liqflow::push::{PushChannel, WsChannel};
use liqflow::settlements::SettlementsRepo;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "liqctl <command>\n\
     Commands:\n\
     - list\n\
     - totals <settlement_id>\n\
     - status <job_id>\n\
     - send <settlement_id>... [--subject <text>] [--body <text>]\n\
     \n\
     While sending, type `r` + Enter to reconnect live updates.\n\
     \n\
     Uses LIQFLOW_API_URL, LIQFLOW_WS_URL, LIQFLOW_USER_ID, LIQFLOW_API_TOKEN.\n";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liqflow=info,liqctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let cfg = Config::from_env()?;
    let client = make_client(&cfg)?;

    match args[1].as_str() {
        "list" => list(&SettlementsRepo::new(client, &cfg.api_url)).await?,
        "totals" => {
            let Some(id) = args.get(2) else {
                anyhow::bail!("usage: liqctl totals <settlement_id>");
            };
            totals(&SettlementsRepo::new(client, &cfg.api_url), id).await?;
        }
        "status" => {
            let Some(job_id) = args.get(2) else {
                anyhow::bail!("usage: liqctl status <job_id>");
            };
            let api = HttpJobsApi::new(client, &cfg.api_url);
            let snapshot = api.status(job_id).await?;
            println!(
                "job {job_id}: status={} progress={}% total_emails={} error={}",
                snapshot.status,
                snapshot.progress,
                snapshot
                    .total_emails
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                snapshot.error.as_deref().unwrap_or("-"),
            );
        }
        "send" => {
            let (ids, draft) = parse_send_args(&args[2..])?;
            send(&cfg, client, ids, draft).await?;
        }
        other => {
            eprintln!("Unknown command: {other}");
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn list(repo: &SettlementsRepo) -> anyhow::Result<()> {
    let settlements = repo.list().await?;
    for s in &settlements {
        println!(
            "{} | {} | {}..{} | email={} | net={}",
            s.id,
            s.display_name(),
            s.period_start,
            s.period_end,
            s.email().unwrap_or("-"),
            s.totals().net
        );
    }
    println!("{} settlements", settlements.len());
    Ok(())
}

async fn totals(repo: &SettlementsRepo, id: &str) -> anyhow::Result<()> {
    let settlement = repo
        .get(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("settlement {id} not found"))?;
    let t = settlement.totals();

    println!(
        "SETTLEMENT: id={} driver={} period={}..{}",
        settlement.id,
        settlement.display_name(),
        settlement.period_start,
        settlement.period_end
    );
    println!("  base salary      {:>14}", t.base_salary);
    println!("  bonuses          {:>14}", t.bonuses);
    println!("  overnight stays  {:>14}", t.overnight_stays);
    println!("  surcharges       {:>14}", t.surcharges);
    println!("  vacation pay     {:>14}", t.vacation_pay);
    println!("  gross            {:>14}", t.gross);
    println!("  advances        -{:>14}", t.advances);
    println!("  net              {:>14}", t.net);
    Ok(())
}

fn parse_send_args(args: &[String]) -> anyhow::Result<(Vec<String>, EmailDraft)> {
    let mut draft = EmailDraft::default();
    let mut ids = Vec::new();
    let mut it = args.iter();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--subject" => {
                draft.subject = it
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--subject needs a value"))?
                    .clone();
            }
            "--body" => {
                draft.body = it
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--body needs a value"))?
                    .clone();
            }
            id => ids.push(id.to_string()),
        }
    }

    if ids.is_empty() {
        anyhow::bail!("usage: liqctl send <settlement_id>... [--subject <text>] [--body <text>]");
    }
    Ok((ids, draft))
}

async fn send(
    cfg: &Config,
    client: reqwest::Client,
    ids: Vec<String>,
    draft: EmailDraft,
) -> anyhow::Result<()> {
    let settlements = SettlementsRepo::new(client.clone(), &cfg.api_url)
        .list()
        .await?;

    let channel: Option<Arc<dyn PushChannel>> = cfg
        .ws_url
        .as_ref()
        .map(|url| Arc::new(WsChannel::new(url.clone())) as Arc<dyn PushChannel>);

    let lines = stdin_lines();
    let coordinator = Coordinator::new(
        Arc::new(HttpJobsApi::new(client, &cfg.api_url)),
        channel,
        Arc::new(LogNotifier),
        Arc::new(LineConfirm::new(lines.clone())),
        cfg.timing.clone(),
    );

    coordinator.open(cfg.user_id.as_deref()).await;
    let job_id = coordinator.submit(&settlements, &ids, &draft).await?;
    println!("job {job_id} submitted for {} settlements", ids.len());

    let mut state = coordinator.watch();
    let mut view = coordinator.watch_view();
    let mut stdin_open = true;

    if coordinator.view().can_reconnect() {
        println!("live updates unavailable; type `r` + Enter to reconnect");
    }

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = state.borrow_and_update().clone();
                println!(
                    "[{}] {}/{} ({}%) {}",
                    s.status,
                    s.progress.current,
                    s.progress.total,
                    s.progress.percent(),
                    s.progress.message
                );
                if s.status == JobStatus::Failed {
                    anyhow::bail!(
                        "job {job_id} failed: {}",
                        s.error.unwrap_or_else(|| "unknown error".to_string())
                    );
                }
            }
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let v = *view.borrow_and_update();
                if !v.open {
                    break;
                }
                if v.channel == ChannelState::Unavailable {
                    println!("live updates unavailable; type `r` + Enter to reconnect");
                }
            }
            line = next_line(&lines), if stdin_open => match line {
                Some(line) if line.trim().eq_ignore_ascii_case("r") => {
                    if !coordinator.reconnect_if_unavailable().await {
                        println!("live updates are not down, nothing to reconnect");
                    }
                }
                Some(_) => {}
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                if coordinator.request_close().await {
                    println!("closed; the backend keeps sending any remaining emails");
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn next_line(lines: &Lines) -> Option<String> {
    lines.lock().await.recv().await
}
