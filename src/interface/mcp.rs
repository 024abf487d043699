//! MCP Server for bookstore-mcp
//!
//! MCP Protocol (stdio) <-> application::CatalogService
//!
//! 10 tools: list_books, find_book, random_book, add_book, remove_book_by_id,
//! remove_book_by_title, update_book_title, update_book_price, books_by_genre,
//! books_by_author

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::application::error::AppError;
use crate::application::service::CatalogService;
use crate::domain::error::{DomainError, Lookup};
use crate::domain::model::book::{Book, Genre, NewBook};
use crate::domain::model::id::BookId;
use crate::infra::json_store::JsonCatalogRepository;

const GREETING: &str = "Hello, this is my bookstore";
const MSG_ADDED: &str = "New Book was added to the Bookstore";
const MSG_REMOVED: &str = "Book was removed from the Bookstore";
const MSG_UPDATED: &str = "Book was updated";
const MSG_NOT_FOUND: &str = "Book not found";
const MSG_EMPTY: &str = "No books available";

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverを起動する。book_pathはバッキングファイル（無ければ空で開始）。
pub async fn run(book_path: PathBuf) -> anyhow::Result<()> {
    let repo = JsonCatalogRepository::new(book_path);
    tracing::info!(path = %repo.path().display(), "opening catalog");
    let service = CatalogService::open(repo)?;
    tracing::info!(books = service.count(), "serving catalog over stdio");
    let server = BookstoreMcpServer::new(service);
    let running = server.serve(stdio()).await?;
    running.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

type Store = CatalogService<JsonCatalogRepository>;

#[derive(Clone)]
struct BookstoreMcpServer {
    /// 全tool呼び出しはこのロック内で完結させる（read-modify-persistを直列化）。
    store: Arc<Mutex<Store>>,
    tool_router: ToolRouter<Self>,
}

impl BookstoreMcpServer {
    fn new(service: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(service)),
            tool_router: Self::tool_router(),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, McpError> {
        self.store
            .lock()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for BookstoreMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bookstore-mcp".to_string(),
                title: Some("Bookstore MCP — Book Catalog".to_string()),
                description: Some(
                    "Flat book catalog persisted to a single JSON file.".to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "{GREETING}.\n\
                 \n\
                 Tools: `list_books`, `find_book`, `random_book`, `books_by_genre`, `books_by_author` to read; \
                 `add_book`, `update_book_title`, `update_book_price`, `remove_book_by_id`, \
                 `remove_book_by_title` to change the catalog. Book IDs are assigned by the store."
            )),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn parse_genre(s: &str) -> Result<Genre, McpError> {
    s.parse::<Genre>()
        .map_err(|e| McpError::invalid_params(format!("{e}"), None))
}

/// 価格は有限かつ0以上。
fn validate_price(price: f64) -> Result<f64, McpError> {
    if !price.is_finite() || price < 0.0 {
        return Err(McpError::invalid_params(
            format!("price must be a non-negative number, got {price}"),
            None,
        ));
    }
    Ok(price)
}

fn to_mcp_error(e: AppError) -> McpError {
    match e {
        AppError::Domain(DomainError::NotFound(Lookup::AnyBook)) => {
            McpError::resource_not_found(MSG_EMPTY, None)
        }
        AppError::Domain(DomainError::NotFound(_)) => {
            McpError::resource_not_found(MSG_NOT_FOUND, None)
        }
        other => {
            tracing::error!(error = %other, "tool call failed");
            McpError::internal_error(format!("{other}"), None)
        }
    }
}

fn json_text(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| McpError::internal_error(format!("Failed to encode result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn books_json<'a>(books: impl IntoIterator<Item = &'a Book>) -> serde_json::Value {
    let books: Vec<&Book> = books.into_iter().collect();
    serde_json::json!({ "books": books })
}

fn book_json(book: &Book) -> serde_json::Value {
    serde_json::json!({ "book": book })
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpListBooksRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpRandomBookRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookIdRequest {
    #[schemars(description = "Book ID as returned by `add_book` or `list_books`")]
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpAddBookRequest {
    #[schemars(description = "Book title")]
    pub title: String,
    #[schemars(description = "Author name")]
    pub author: String,
    #[schemars(description = "Genre: fiction or non-fiction")]
    pub genre: String,
    #[schemars(description = "Price (non-negative)")]
    pub price: f64,
    #[schemars(description = "Ignored. IDs are always assigned by the store.")]
    #[serde(default)]
    pub book_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpRemoveByTitleRequest {
    #[schemars(description = "Exact title to remove (case-insensitive). Removes the first match.")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpUpdateTitleRequest {
    #[schemars(description = "Book ID")]
    pub book_id: String,
    #[schemars(description = "New title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpUpdatePriceRequest {
    #[schemars(description = "Book ID")]
    pub book_id: String,
    #[schemars(description = "New price (non-negative)")]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpGenreRequest {
    #[schemars(description = "Genre: fiction or non-fiction")]
    pub genre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpAuthorRequest {
    #[schemars(description = "Author name (exact, case-sensitive match)")]
    pub author: String,
}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl BookstoreMcpServer {
    #[tool(
        name = "list_books",
        description = "List every book in the catalog, in insertion order.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn list_books(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpListBooksRequest>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store()?;
        json_text(books_json(store.list_all()))
    }

    #[tool(
        name = "find_book",
        description = "Find one book by its ID.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn find_book(
        &self,
        Parameters(req): Parameters<McpBookIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store()?;
        let book = store
            .find_by_id(&BookId::from(req.book_id))
            .map_err(to_mcp_error)?;
        json_text(book_json(book))
    }

    #[tool(
        name = "random_book",
        description = "Pick one book from the catalog at random.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn random_book(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpRandomBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store()?;
        let book = store.random_one().map_err(to_mcp_error)?;
        json_text(book_json(book))
    }

    #[tool(
        name = "add_book",
        description = "Add a new book. The store assigns its ID; any client-supplied book_id is ignored.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn add_book(
        &self,
        Parameters(req): Parameters<McpAddBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let genre = parse_genre(&req.genre)?;
        let price = validate_price(req.price)?;
        if let Some(client_id) = &req.book_id {
            tracing::warn!(client_id = %client_id, "discarding client-supplied book_id");
        }

        let mut store = self.store()?;
        let book = store
            .add(NewBook {
                title: req.title,
                author: req.author,
                genre,
                price,
            })
            .map_err(to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "{MSG_ADDED} (book_id: {})",
            book.id()
        ))]))
    }

    #[tool(
        name = "remove_book_by_id",
        description = "Remove the book with the given ID.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn remove_book_by_id(
        &self,
        Parameters(req): Parameters<McpBookIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut store = self.store()?;
        store
            .remove_by_id(&BookId::from(req.book_id))
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(MSG_REMOVED)]))
    }

    #[tool(
        name = "remove_book_by_title",
        description = "Remove the first book whose title matches exactly, ignoring case.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn remove_book_by_title(
        &self,
        Parameters(req): Parameters<McpRemoveByTitleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut store = self.store()?;
        store.remove_by_title(&req.title).map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(MSG_REMOVED)]))
    }

    #[tool(
        name = "update_book_title",
        description = "Change the title of a book. Other fields are left unchanged.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn update_book_title(
        &self,
        Parameters(req): Parameters<McpUpdateTitleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut store = self.store()?;
        store
            .update_title(&BookId::from(req.book_id), req.title)
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(MSG_UPDATED)]))
    }

    #[tool(
        name = "update_book_price",
        description = "Change the price of a book. Other fields are left unchanged.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn update_book_price(
        &self,
        Parameters(req): Parameters<McpUpdatePriceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let price = validate_price(req.price)?;
        let mut store = self.store()?;
        store
            .update_price(&BookId::from(req.book_id), price)
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(MSG_UPDATED)]))
    }

    #[tool(
        name = "books_by_genre",
        description = "List books of one genre (fiction or non-fiction). Returns an empty list when none match.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn books_by_genre(
        &self,
        Parameters(req): Parameters<McpGenreRequest>,
    ) -> Result<CallToolResult, McpError> {
        let genre = parse_genre(&req.genre)?;
        let store = self.store()?;
        json_text(books_json(store.filter_by_genre(genre)))
    }

    #[tool(
        name = "books_by_author",
        description = "List books by an author (exact match). Returns an empty list when none match.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn books_by_author(
        &self,
        Parameters(req): Parameters<McpAuthorRequest>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store()?;
        json_text(books_json(store.filter_by_author(&req.author)))
    }
}

// =============================================================================
// Tests
// =============================================================================
