//! arXiv search and PDF download tools.
//!
//! Both operations report failures as readable Portuguese messages rather than errors,
//! since their output goes straight back to an agent.

use crate::error::{CrewLabError, Result};
use crate::llm::tools::{FunctionTool, LlmTool};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
const MAX_RESULTS: usize = 5;

/// One article from an arXiv search
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivEntry {
    pub title: String,
    pub summary: String,
    pub primary_category: String,
    /// Entry id, e.g. `http://arxiv.org/abs/2401.00001v1`
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

impl ArxivEntry {
    fn describe(&self) -> String {
        format!(
            "Título: {}\nResumo: {}\nCategoria: {}\nLink: {}\n",
            self.title, self.summary, self.primary_category, self.link
        )
    }
}

/// Client for the arXiv Atom API and PDF mirror.
#[derive(Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    api_url: String,
    pdf_url: String,
    download_dir: PathBuf,
    results_path: PathBuf,
}

impl ArxivClient {
    /// `download_dir` receives PDFs; `results_path` holds the links of the last search.
    pub fn new(download_dir: impl Into<PathBuf>, results_path: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: ARXIV_API_URL.to_string(),
            pdf_url: ARXIV_PDF_URL.to_string(),
            download_dir: download_dir.into(),
            results_path: results_path.into(),
        }
    }

    /// Point the client at other endpoints.
    pub fn with_endpoints(mut self, api_url: impl Into<String>, pdf_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.pdf_url = pdf_url.into();
        self
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Search articles by relevance and describe the top results.
    ///
    /// The entry links are saved to the results file so that a later step can
    /// download them.
    pub async fn search(&self, query: &str) -> String {
        match self.search_and_save(query).await {
            Ok(entries) if entries.is_empty() => "Nenhum artigo encontrado.".to_string(),
            Ok(entries) => entries.iter().map(ArxivEntry::describe).collect::<Vec<_>>().join("\n\n"),
            Err(e) => format!("Ocorreu um erro ao buscar no arXiv: {}", e),
        }
    }

    async fn search_and_save(&self, query: &str) -> Result<Vec<ArxivEntry>> {
        let entries = self.fetch_entries(query).await?;

        let links: Vec<&str> = entries.iter().map(|e| e.link.as_str()).collect();
        if let Some(parent) = self.results_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.results_path, serde_json::to_vec(&links)?).await?;
        info!(path = %self.results_path.display(), count = links.len(), "Saved arXiv search results");

        Ok(entries)
    }

    pub async fn fetch_entries(&self, query: &str) -> Result<Vec<ArxivEntry>> {
        let url = format!(
            "{}?search_query=all:{}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
            self.api_url,
            urlencoding::encode(query),
            MAX_RESULTS
        );
        info!(query, "Searching arXiv");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CrewLabError::ApiError(format!(
                "arXiv API returned status {}",
                response.status()
            )));
        }

        let feed = response.text().await?;
        parse_feed(&feed)
    }

    /// Download the PDF of an article given its arXiv link.
    pub async fn download_pdf(&self, link: &str) -> String {
        if !link.contains("arxiv.org") {
            return "O link fornecido não é um link válido do arXiv.".to_string();
        }

        let article_id = link.split('/').last().unwrap_or_default();
        let pdf_url = format!("{}/{}.pdf", self.pdf_url, article_id);

        match self.fetch_pdf(&pdf_url, article_id).await {
            Ok(Ok(path)) => format!("PDF salvo como {}", path.display()),
            Ok(Err(status)) => format!("Erro ao baixar o PDF. Código de status: {}", status),
            Err(e) => {
                warn!(url = %pdf_url, error = %e, "PDF download failed");
                format!("Ocorreu um erro: {}", e)
            }
        }
    }

    /// Inner result carries the HTTP status when the server refuses the download.
    async fn fetch_pdf(
        &self,
        pdf_url: &str,
        article_id: &str,
    ) -> Result<std::result::Result<PathBuf, u16>> {
        info!(url = pdf_url, "Downloading PDF");
        let response = self.client.get(pdf_url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Ok(Err(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(format!("artigo_{}.pdf", article_id));
        tokio::fs::write(&path, &bytes).await?;

        Ok(Ok(path))
    }

    /// Links saved by the last search.
    pub async fn saved_links(&self) -> Result<Vec<String>> {
        let raw = tokio::fs::read(&self.results_path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Parse an arXiv Atom feed.
pub fn parse_feed(feed: &str) -> Result<Vec<ArxivEntry>> {
    let document = Html::parse_document(feed);
    let entry_selector = selector("entry")?;
    let title_selector = selector("title")?;
    let summary_selector = selector("summary")?;
    let id_selector = selector("id")?;
    let category_selector = selector("category")?;
    let published_selector = selector("published")?;

    let entries = document
        .select(&entry_selector)
        .filter_map(|entry| {
            let link = first_text(&entry, &id_selector)?;
            let primary_category = entry
                .descendants()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "arxiv:primary_category")
                .or_else(|| entry.select(&category_selector).next())
                .and_then(|e| e.value().attr("term"))
                .unwrap_or_default()
                .to_string();

            Some(ArxivEntry {
                title: first_text(&entry, &title_selector).unwrap_or_default(),
                summary: first_text(&entry, &summary_selector).unwrap_or_default(),
                primary_category,
                link,
                published: first_text(&entry, &published_selector)
                    .and_then(|p| DateTime::parse_from_rfc3339(&p).ok())
                    .map(|p| p.with_timezone(&Utc)),
            })
        })
        .collect();

    Ok(entries)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrewLabError::DataError(format!("Invalid selector: {:?}", e)))
}

/// Whitespace-collapsed text of the first matching *direct* element; nested self-closing
/// Atom tags make the HTML parser nest siblings, so only the element's own text nodes count.
fn first_text(entry: &ElementRef, selector: &Selector) -> Option<String> {
    let element = entry.select(selector).next()?;
    let text: String = element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

#[derive(Deserialize, JsonSchema)]
struct SearchArticlesArgs {
    /// Título ou tema dos artigos a pesquisar
    query: String,
}

#[derive(Deserialize, JsonSchema)]
struct DownloadArgs {
    /// Link do artigo no arXiv, por exemplo http://arxiv.org/abs/2401.00001v1
    link: String,
}

#[derive(Deserialize, JsonSchema)]
struct NoArgs {}

pub fn search_articles_tool(client: Arc<ArxivClient>) -> Box<dyn LlmTool> {
    Box::new(FunctionTool::from_fn(
        "search_arxiv_articles",
        "Pesquisa artigos científicos no arXiv pelo título ou tema e retorna título, resumo, categoria e link dos 5 mais relevantes.",
        move |args: SearchArticlesArgs| {
            let client = Arc::clone(&client);
            async move { Ok(client.search(&args.query).await) }
        },
    ))
}

pub fn download_pdf_tool(client: Arc<ArxivClient>) -> Box<dyn LlmTool> {
    Box::new(FunctionTool::from_fn(
        "download_arxiv_pdf",
        "Baixa o PDF de um artigo do arXiv a partir do seu link e informa onde o arquivo foi salvo.",
        move |args: DownloadArgs| {
            let client = Arc::clone(&client);
            async move { Ok(client.download_pdf(&args.link).await) }
        },
    ))
}

pub fn saved_links_tool(client: Arc<ArxivClient>) -> Box<dyn LlmTool> {
    Box::new(FunctionTool::from_fn(
        "read_saved_arxiv_links",
        "Lê os links de artigos salvos pela última pesquisa no arXiv.",
        move |_: NoArgs| {
            let client = Arc::clone(&client);
            async move {
                Ok(match client.saved_links().await {
                    Ok(links) if !links.is_empty() => links.join("\n"),
                    Ok(_) => "Nenhum artigo encontrado.".to_string(),
                    Err(e) => format!("Nenhuma pesquisa salva foi encontrada: {}", e),
                })
            }
        },
    ))
}

/// All three arXiv tools sharing one client.
pub fn arxiv_tools(client: Arc<ArxivClient>) -> Vec<Box<dyn LlmTool>> {
    vec![
        search_articles_tool(Arc::clone(&client)),
        download_pdf_tool(Arc::clone(&client)),
        saved_links_tool(client),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:IA</title>
  <id>http://arxiv.org/api/feed-id</id>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-02T18:30:00Z</published>
    <title>Generative AI
      Trends</title>
    <summary>  A survey of generative models.
    </summary>
    <link href="http://arxiv.org/abs/2401.00001v1" rel="alternate" type="text/html"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2402.00002v2</id>
    <title>Ethics in AI</title>
    <summary>On responsible AI.</summary>
    <category term="cs.CY" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;

    fn client_for(server: &Server, dir: &TempDir) -> ArxivClient {
        ArxivClient::new(dir.path().join("downloads"), dir.path().join("arxiv_results.json"))
            .with_endpoints(format!("{}/api/query", server.url()), format!("{}/pdf", server.url()))
    }

    #[test]
    fn test_parse_feed() {
        let entries = parse_feed(FEED).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Generative AI Trends");
        assert_eq!(entries[0].summary, "A survey of generative models.");
        assert_eq!(entries[0].primary_category, "cs.AI");
        assert_eq!(entries[0].link, "http://arxiv.org/abs/2401.00001v1");
        assert_eq!(
            entries[0].published.map(|p| p.date_naive().to_string()),
            Some("2024-01-02".to_string())
        );

        assert_eq!(entries[1].title, "Ethics in AI");
        assert_eq!(entries[1].primary_category, "cs.CY");
        assert!(entries[1].published.is_none());
    }

    #[test]
    fn test_parse_empty_feed() {
        assert!(parse_feed(EMPTY_FEED).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_formats_and_saves_links() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "all:IA generativa".into()),
                Matcher::UrlEncoded("max_results".into(), "5".into()),
                Matcher::UrlEncoded("sortBy".into(), "relevance".into()),
            ]))
            .with_status(200)
            .with_body(FEED)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client_for(&server, &dir);

        let result = client.search("IA generativa").await;

        mock.assert_async().await;
        assert!(result.starts_with("Título: Generative AI Trends\nResumo: A survey of generative models.\nCategoria: cs.AI\nLink: http://arxiv.org/abs/2401.00001v1\n"));
        assert!(result.contains("\n\n\nTítulo: Ethics in AI"));

        let links = client.saved_links().await.unwrap();
        assert_eq!(
            links,
            vec![
                "http://arxiv.org/abs/2401.00001v1".to_string(),
                "http://arxiv.org/abs/2402.00002v2".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(EMPTY_FEED)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = client_for(&server, &dir).search("nada").await;

        assert_eq!(result, "Nenhum artigo encontrado.");
    }

    #[tokio::test]
    async fn test_search_error_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = client_for(&server, &dir).search("IA").await;

        assert!(result.starts_with("Ocorreu um erro ao buscar no arXiv: "));
        assert!(result.contains("503"));
    }

    #[tokio::test]
    async fn test_download_rejects_foreign_link() {
        let dir = TempDir::new().unwrap();
        let client = ArxivClient::new(dir.path(), dir.path().join("r.json"));

        assert_eq!(
            client.download_pdf("https://example.com/paper").await,
            "O link fornecido não é um link válido do arXiv."
        );
    }

    #[tokio::test]
    async fn test_download_saves_pdf() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pdf/2401.00001v1.pdf")
            .with_status(200)
            .with_body(b"%PDF-1.4 fake")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client_for(&server, &dir);

        let result = client.download_pdf("http://arxiv.org/abs/2401.00001v1").await;

        mock.assert_async().await;
        let expected = dir.path().join("downloads").join("artigo_2401.00001v1.pdf");
        assert_eq!(result, format!("PDF salvo como {}", expected.display()));
        assert_eq!(std::fs::read(expected).unwrap(), b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn test_download_reports_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pdf/9999.99999.pdf")
            .with_status(404)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = client_for(&server, &dir).download_pdf("https://arxiv.org/abs/9999.99999").await;

        assert_eq!(result, "Erro ao baixar o PDF. Código de status: 404");
    }

    #[tokio::test]
    async fn test_saved_links_tool_without_search() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(ArxivClient::new(dir.path(), dir.path().join("missing.json")));
        let tool = saved_links_tool(client);

        let result = tool.run(&HashMap::new()).await.unwrap();
        assert!(result.as_str().unwrap().starts_with("Nenhuma pesquisa salva"));
    }

    #[test]
    fn test_arxiv_tool_names() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(ArxivClient::new(dir.path(), dir.path().join("r.json")));
        let names: Vec<String> =
            arxiv_tools(client).iter().map(|t| t.descriptor().function.name).collect();

        assert_eq!(names, vec!["search_arxiv_articles", "download_arxiv_pdf", "read_saved_arxiv_links"]);
    }

    #[tokio::test]
    async fn test_download_tool_requires_link() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(ArxivClient::new(dir.path(), dir.path().join("r.json")));
        let tool = download_pdf_tool(client);

        let mut args = HashMap::new();
        args.insert("url".to_string(), json!("x"));
        assert!(tool.run(&args).await.is_err());
    }
}
