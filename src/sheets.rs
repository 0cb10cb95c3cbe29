use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::SheetsConfig;
use crate::consolidate::dataset::ConsolidatedDataset;
use crate::consolidate::render::{column_letter, is_total_label};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// The dataset flattened into the single-worksheet shape the mirror keeps:
/// one header row (`Item` + timepoint labels) and one row per distinct
/// display label, merged across sections. Row order is alphabetical with
/// TOTAL rows last; when the same label appears in several sections the
/// later section's values win, matching the dataset merge.
#[derive(Debug)]
pub struct MirrorData {
    pub timepoints: Vec<String>,
    pub rows: Vec<(String, BTreeMap<String, i64>)>,
}

impl MirrorData {
    pub fn from_dataset(dataset: &ConsolidatedDataset) -> MirrorData {
        let timepoints: Vec<String> = dataset
            .sorted_timepoints()
            .iter()
            .map(|tp| tp.to_string())
            .collect();

        let mut merged: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
        for section_rows in dataset.sections().values() {
            for row in section_rows.values() {
                let entry = merged.entry(row.display.clone()).or_default();
                for (tp, value) in &row.values {
                    entry.insert(tp.to_string(), *value);
                }
            }
        }

        let mut rows: Vec<(String, BTreeMap<String, i64>)> = merged.into_iter().collect();
        rows.sort_by(|a, b| {
            is_total_label(&a.0)
                .cmp(&is_total_label(&b.0))
                .then_with(|| a.0.cmp(&b.0))
        });
        MirrorData { timepoints, rows }
    }

    /// Header plus every data row, as the string grid a full write takes.
    fn full_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        let mut header = Vec::with_capacity(self.timepoints.len() + 1);
        header.push("Item".to_string());
        header.extend(self.timepoints.iter().cloned());
        out.push(header);
        for (label, values) in &self.rows {
            let mut row = Vec::with_capacity(self.timepoints.len() + 1);
            row.push(label.clone());
            row.extend(self.timepoints.iter().map(|tp| cell_string(values, tp)));
            out.push(row);
        }
        out
    }
}

fn cell_string(values: &BTreeMap<String, i64>, timepoint: &str) -> String {
    values
        .get(timepoint)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// One ranged write against the values API, in A1 notation.
#[derive(Debug, PartialEq)]
pub struct RangeUpdate {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// What a sync run needs to do to bring the remote worksheet up to date.
#[derive(Debug, PartialEq)]
pub enum SyncPlan {
    Noop,
    /// Remote worksheet is empty; write header and rows from scratch.
    FullWrite(Vec<Vec<String>>),
    /// Append-only updates: new timepoint columns on the right, new label
    /// rows below. Cells the worksheet already holds are never rewritten.
    Append(Vec<RangeUpdate>),
}

/// Diff our flattened data against the remote header row and label column.
///
/// Timepoints missing from the remote header become columns appended after
/// the last existing one, with values filled for the rows the worksheet
/// already has (in the worksheet's own row order). Labels missing from the
/// remote first column become full-width rows appended below, laid out in
/// the column order the worksheet has after the column append.
pub fn compute_delta(
    worksheet: &str,
    remote_header: &[String],
    remote_labels: &[String],
    data: &MirrorData,
) -> SyncPlan {
    if remote_header.is_empty() {
        return SyncPlan::FullWrite(data.full_rows());
    }

    let have_timepoints: BTreeSet<&str> =
        remote_header.iter().skip(1).map(|s| s.as_str()).collect();
    let new_timepoints: Vec<&str> = data
        .timepoints
        .iter()
        .map(|tp| tp.as_str())
        .filter(|tp| !have_timepoints.contains(tp))
        .collect();

    let have_labels: BTreeSet<&str> = remote_labels.iter().map(|s| s.as_str()).collect();
    let new_rows: Vec<&(String, BTreeMap<String, i64>)> = data
        .rows
        .iter()
        .filter(|(label, _)| !have_labels.contains(label.as_str()))
        .collect();

    let by_label: BTreeMap<&str, &BTreeMap<String, i64>> = data
        .rows
        .iter()
        .map(|(label, values)| (label.as_str(), values))
        .collect();

    let sheet = sheet_ref(worksheet);
    let mut updates = Vec::new();

    if !new_timepoints.is_empty() {
        let mut values = Vec::with_capacity(remote_labels.len() + 1);
        values.push(new_timepoints.iter().map(|tp| tp.to_string()).collect());
        for label in remote_labels {
            let row_values = by_label.get(label.as_str());
            values.push(
                new_timepoints
                    .iter()
                    .map(|tp| {
                        row_values
                            .map(|v| cell_string(v, tp))
                            .unwrap_or_default()
                    })
                    .collect(),
            );
        }
        let start = column_letter(remote_header.len() + 1);
        let end = column_letter(remote_header.len() + new_timepoints.len());
        updates.push(RangeUpdate {
            range: format!("{sheet}!{start}1:{end}{}", remote_labels.len() + 1),
            values,
        });
    }

    if !new_rows.is_empty() {
        let column_order: Vec<&str> = remote_header
            .iter()
            .skip(1)
            .map(|s| s.as_str())
            .chain(new_timepoints.iter().copied())
            .collect();
        let values: Vec<Vec<String>> = new_rows
            .iter()
            .map(|(label, row_values)| {
                let mut row = Vec::with_capacity(column_order.len() + 1);
                row.push(label.clone());
                row.extend(column_order.iter().map(|tp| cell_string(row_values, tp)));
                row
            })
            .collect();
        let first = remote_labels.len() + 2;
        let last = first + new_rows.len() - 1;
        let end = column_letter(remote_header.len() + new_timepoints.len());
        updates.push(RangeUpdate {
            range: format!("{sheet}!A{first}:{end}{last}"),
            values,
        });
    }

    if updates.is_empty() {
        SyncPlan::Noop
    } else {
        SyncPlan::Append(updates)
    }
}

fn sheet_ref(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Thin client for the spreadsheet values API, authenticated with a bearer
/// token taken from the environment.
pub struct SheetsClient {
    http: Client,
    spreadsheet_id: String,
    worksheet: String,
    token: String,
}

impl SheetsClient {
    pub fn from_config(http: Client, config: &SheetsConfig) -> Result<SheetsClient> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| anyhow!("environment variable {} is not set", config.token_env))?;
        Ok(SheetsClient {
            http,
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            token,
        })
    }

    /// Mirror the dataset to the remote worksheet. An empty worksheet gets a
    /// full write; otherwise only new timepoint columns and new label rows
    /// are appended, so cells already on the sheet stay untouched.
    pub async fn sync(&self, dataset: &ConsolidatedDataset) -> Result<()> {
        let data = MirrorData::from_dataset(dataset);
        let remote_header = self
            .read_range("1:1")
            .await
            .context("reading remote header row")?
            .into_iter()
            .next()
            .unwrap_or_default();
        let remote_labels: Vec<String> = self
            .read_range("A:A")
            .await
            .context("reading remote label column")?
            .into_iter()
            .skip(1) // header cell
            .filter_map(|row| row.into_iter().next())
            .collect();

        match compute_delta(&self.worksheet, &remote_header, &remote_labels, &data) {
            SyncPlan::Noop => {
                info!("worksheet already up to date");
            }
            SyncPlan::FullWrite(rows) => {
                info!(rows = rows.len(), "writing worksheet from scratch");
                self.write(&rows).await?;
            }
            SyncPlan::Append(updates) => {
                info!(ranges = updates.len(), "appending new columns and rows");
                self.batch_update(&updates).await?;
            }
        }
        Ok(())
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = format!(
            "{API_BASE}/{}/values/{}!{range}",
            self.spreadsheet_id,
            sheet_ref(&self.worksheet)
        );
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        let body: ValuesResponse = resp.json().await?;
        Ok(body.values)
    }

    async fn write(&self, rows: &[Vec<String>]) -> Result<()> {
        let url = format!(
            "{API_BASE}/{}/values/{}?valueInputOption=RAW",
            self.spreadsheet_id,
            sheet_ref(&self.worksheet)
        );
        self.http
            .put(url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": rows }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn batch_update(&self, updates: &[RangeUpdate]) -> Result<()> {
        let data: Vec<_> = updates
            .iter()
            .map(|u| json!({ "range": u.range, "values": u.values }))
            .collect();
        let url = format!("{API_BASE}/{}/values:batchUpdate", self.spreadsheet_id);
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
