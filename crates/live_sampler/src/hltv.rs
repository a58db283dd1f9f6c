//! HLTV.org live scoreboard via headless Chrome.
//!
//! Match page structure (scorebot):
//! <div class="score"> <span class="ctScore">9</span> <span class="tScore">4</span> </div>
//! <table class="team"> <thead class="ctTeamHeaderBg"> ... <div class="teamName">NaVi</div>
//!
//! The scorebot is rendered client-side, so plain HTTP fetches only see an
//! empty shell; every session keeps its own tab open and re-reads the DOM.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

use crate::{LiveSession, Sample, ScoreSampler};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const CT_SCORE: &str = ".score .ctScore";
const T_SCORE: &str = ".score .tScore";
const CT_NAME: &str = "table.team thead.ctTeamHeaderBg .teamName";
const T_NAME: &str = "table.team thead.tTeamHeaderBg .teamName";

/// Static match metadata from the match page header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchInfo {
    pub team1: String,
    pub team2: String,
    /// 1, 3 or 5; `None` when the page does not state the series length.
    pub best_of: Option<u8>,
}

fn first_text(document: &Html, css: &str) -> String {
    let Ok(selector) = Selector::parse(css) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Reads the scorebot out of a rendered match page.
pub fn parse_scoreboard(html: &str) -> Sample {
    let document = Html::parse_document(html);
    Sample::from_raw(
        &first_text(&document, CT_NAME),
        &first_text(&document, CT_SCORE),
        &first_text(&document, T_SCORE),
        &first_text(&document, T_NAME),
    )
}

/// Reads team names and series length from the match page header.
pub fn parse_match_info(html: &str) -> Option<MatchInfo> {
    let document = Html::parse_document(html);
    let team_selector = Selector::parse(".teamsBox .team .teamName").ok()?;

    let teams: Vec<String> = document
        .select(&team_selector)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .take(2)
        .collect();
    if teams.len() < 2 {
        return None;
    }

    let format_text = first_text(&document, ".padding.preformatted-text");
    let best_of = [1u8, 3, 5]
        .into_iter()
        .find(|n| format_text.contains(&format!("Best of {n}")));

    Some(MatchInfo {
        team1: teams[0].clone(),
        team2: teams[1].clone(),
        best_of,
    })
}

/// `https://www.hltv.org/matches/2370001/navi-vs-faze` → `2370001`
pub fn match_id_from_url(url: &str) -> Option<String> {
    let re = Regex::new(r"hltv\.org/matches/(\d+)").ok()?;
    re.captures(url).map(|c| c[1].to_string())
}

/// Shares one headless Chrome across all sessions; launched on first use.
pub struct HltvSampler {
    browser: Mutex<Option<Arc<Browser>>>,
    page_load_timeout: Duration,
}

impl HltvSampler {
    pub fn new(page_load_timeout: Duration) -> Self {
        Self {
            browser: Mutex::new(None),
            page_load_timeout,
        }
    }

    async fn browser(&self) -> Result<Arc<Browser>> {
        let mut slot = self.browser.lock().await;
        if let Some(browser) = slot.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let browser = task::spawn_blocking(|| -> Result<Browser> {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .idle_browser_timeout(Duration::from_secs(600))
                .build()
                .context("Failed to build Chrome launch options")?;
            Browser::new(options).context("Failed to launch Chrome")
        })
        .await??;

        info!("Headless Chrome launched");
        let browser = Arc::new(browser);
        *slot = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// Drops the shared browser so the next open relaunches it.
    async fn reset_browser(&self) {
        self.browser.lock().await.take();
    }

    async fn open_tab(&self, url: &str) -> Result<Arc<Tab>> {
        let browser = self.browser().await?;
        let url = url.to_string();
        let timeout = self.page_load_timeout;

        let opened = task::spawn_blocking(move || -> Result<Arc<Tab>> {
            let tab = browser.new_tab().context("Failed to create browser tab")?;
            tab.set_default_timeout(timeout);
            tab.set_user_agent(USER_AGENT, Some("en-US,en;q=0.9"), None)
                .context("Failed to set user agent")?;
            tab.navigate_to(&url).context("Chrome navigate failed")?;
            tab.wait_until_navigated().context("Chrome navigation did not settle")?;
            Ok(tab)
        })
        .await?;

        if opened.is_err() {
            // a dead browser connection fails every later tab too
            self.reset_browser().await;
        }
        opened
    }

    /// Team names and format for `add-match`.
    pub async fn fetch_match_info(&self, url: &str) -> Result<MatchInfo> {
        let mut session = HltvSession::new(self.open_tab(url).await?, url);
        // header is rendered after Cloudflare settles
        tokio::time::sleep(Duration::from_secs(5)).await;

        let html = session.content().await;
        session.close().await;

        let html = html?;
        parse_match_info(&html).ok_or_else(|| anyhow!("match header not found on {url}"))
    }
}

#[async_trait]
impl ScoreSampler for HltvSampler {
    async fn open(&self, match_url: &str) -> Result<Box<dyn LiveSession>> {
        let tab = self
            .open_tab(match_url)
            .await
            .with_context(|| format!("open live view {match_url}"))?;
        Ok(Box::new(HltvSession::new(tab, match_url)))
    }
}

pub struct HltvSession {
    tab: Option<Arc<Tab>>,
    url: String,
}

impl HltvSession {
    fn new(tab: Arc<Tab>, url: &str) -> Self {
        Self {
            tab: Some(tab),
            url: url.to_string(),
        }
    }

    async fn content(&self) -> Result<String> {
        let tab = self
            .tab
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| anyhow!("session closed"))?;
        task::spawn_blocking(move || tab.get_content().context("Failed to read HTML from browser tab")).await?
    }
}

#[async_trait]
impl LiveSession for HltvSession {
    async fn sample(&mut self) -> Sample {
        match self.content().await {
            Ok(html) => parse_scoreboard(&html),
            Err(e) => {
                debug!("scoreboard read failed on {}: {}", self.url, e);
                Sample::Unavailable
            }
        }
    }

    async fn close(&mut self) {
        let Some(tab) = self.tab.take() else {
            return;
        };
        let closed = task::spawn_blocking(move || tab.close(true)).await;
        match closed {
            Ok(Ok(_)) => debug!("tab closed: {}", self.url),
            Ok(Err(e)) => warn!("tab close failed for {}: {}", self.url, e),
            Err(e) => warn!("tab close task failed for {}: {}", self.url, e),
        }
    }
}
