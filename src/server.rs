use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tiny_http::{Header, Method, Response, Server};
use tokio::runtime::Runtime;
use tracing::{error, info};

use crate::config::Config;
use crate::consolidate::PeriodSelection;
use crate::pipeline::{self, ProgressSnapshot};
use crate::{period, scrape};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

struct ServerState {
    config: Config,
    progress: pipeline::SharedProgress,
    running: AtomicBool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateRequest {
    months: Vec<u32>,
    years: Vec<i32>,
}

/// Serve the JSON API: list available months, kick off pipeline runs, poll
/// their progress and download the finished report.
pub fn serve(config: Config, bind: &str, port: u16) -> Result<()> {
    let addr = format!("{bind}:{port}");
    let server =
        Server::http(&addr).map_err(|e| anyhow::anyhow!("binding HTTP server on {addr}: {e}"))?;
    info!(%addr, "listening");

    let state = Arc::new(ServerState {
        config,
        progress: Arc::new(Mutex::new(ProgressSnapshot::default())),
        running: AtomicBool::new(false),
    });

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or("").to_string();

        let outcome = match (&method, path.as_str()) {
            (Method::Get, "/") => respond_json(
                request,
                200,
                &json!({
                    "service": "fadascraper",
                    "endpoints": ["/api/months", "/api/generate", "/api/progress", "/api/download"],
                }),
            ),
            (Method::Get, "/api/months") => handle_months(request, &state),
            (Method::Post, "/api/generate") => handle_generate(&mut request, &state)
                .and_then(|v| respond_json(request, v.0, &v.1)),
            (Method::Get, "/api/progress") => handle_progress(request, &state),
            (Method::Get, "/api/download") => handle_download(request, &state),
            _ => respond_json(request, 404, &json!({ "error": "not found" })),
        };

        if let Err(err) = outcome {
            error!(%path, "request failed: {err:#}");
        }
    }
    Ok(())
}

fn handle_months(request: tiny_http::Request, state: &Arc<ServerState>) -> Result<()> {
    let runtime = Runtime::new().context("creating runtime")?;
    let links = runtime.block_on(async {
        let client = pipeline::http_client(&state.config)?;
        scrape::fetch_pdf_links(&client, &state.config).await
    });

    match links {
        Ok(links) => {
            let months: Vec<_> = scrape::available_months(&links)
                .into_iter()
                .map(|(year, month)| {
                    json!({
                        "year": year,
                        "month": month,
                        "label": period::format_month_year(month, year),
                    })
                })
                .collect();
            respond_json(request, 200, &json!({ "months": months }))
        }
        Err(err) => respond_json(request, 502, &json!({ "error": format!("{err:#}") })),
    }
}

fn handle_generate(
    request: &mut tiny_http::Request,
    state: &Arc<ServerState>,
) -> Result<(u16, serde_json::Value)> {
    let mut body = String::new();
    request
        .as_reader()
        .read_to_string(&mut body)
        .context("reading request body")?;
    let req: GenerateRequest = if body.trim().is_empty() {
        GenerateRequest::default()
    } else {
        match serde_json::from_str(&body) {
            Ok(req) => req,
            Err(e) => return Ok((400, json!({ "error": format!("bad request: {e}") }))),
        }
    };

    if state.running.swap(true, Ordering::SeqCst) {
        return Ok((409, json!({ "error": "a run is already in progress" })));
    }

    let selection = PeriodSelection {
        months: req.months,
        years: req.years,
    };
    let state = state.clone();
    std::thread::spawn(move || {
        let result = Runtime::new().map_err(anyhow::Error::from).and_then(|rt| {
            rt.block_on(pipeline::run_pipeline(
                &state.config,
                &selection,
                state.progress.clone(),
            ))
        });
        if let Err(err) = result {
            error!("pipeline run failed: {err:#}");
        }
        state.running.store(false, Ordering::SeqCst);
    });

    Ok((202, json!({ "started": true })))
}

fn handle_progress(request: tiny_http::Request, state: &Arc<ServerState>) -> Result<()> {
    let snapshot = state
        .progress
        .lock()
        .map(|p| p.clone())
        .unwrap_or_default();
    respond_json(request, 200, &serde_json::to_value(&snapshot)?)
}

fn handle_download(request: tiny_http::Request, state: &Arc<ServerState>) -> Result<()> {
    let artifact = state
        .progress
        .lock()
        .ok()
        .and_then(|p| p.artifact.clone());
    let Some(path) = artifact.filter(|p| p.exists()) else {
        return respond_json(request, 404, &json!({ "error": "no report generated yet" }));
    };

    let file = std::fs::File::open(&path)
        .with_context(|| format!("opening artifact {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report.xlsx".to_string());

    let mut response = Response::from_file(file);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], XLSX_MIME.as_bytes()) {
        response.add_header(header);
    }
    let disposition = format!("attachment; filename=\"{filename}\"");
    if let Ok(header) = Header::from_bytes(&b"Content-Disposition"[..], disposition.as_bytes()) {
        response.add_header(header);
    }
    request.respond(response).context("sending artifact")
}

fn respond_json(request: tiny_http::Request, status: u16, value: &serde_json::Value) -> Result<()> {
    let mut response = Response::from_string(value.to_string()).with_status_code(status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    request.respond(response).context("sending response")
}
