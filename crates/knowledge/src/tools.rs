//! Tools the language model can call, and the manager that dispatches them.
//!
//! The set of tools is closed: [`Tool`] enumerates every kind. Each tool
//! remembers the sources of its most recent execution; [`ToolManager`]
//! keeps the sources of the last tool it ran.

use crate::search::SearchFilter;
use crate::types::Source;
use crate::vector_store::VectorStore;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::ToolDefinition;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SEARCH_TOOL: &str = "search_course_content";
pub const OUTLINE_TOOL: &str = "get_course_outline";

/// Searches course content with optional course and lesson filters.
#[derive(Clone)]
pub struct CourseSearchTool {
    store: Arc<dyn VectorStore>,
    last_sources: Vec<Source>,
}

impl CourseSearchTool {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            last_sources: Vec::new(),
        }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Run a search and format the hits for the model.
    ///
    /// No matches is not an error: the returned text says so and the
    /// source list is left empty. Storage failures are returned as errors.
    pub async fn execute(
        &mut self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> AppResult<String> {
        self.last_sources.clear();
        let requested = SearchFilter::from_parts(course_name, lesson_number);

        let mut filter = SearchFilter::new();
        filter.lesson_number = lesson_number;
        if let Some(name) = &requested.course_name {
            match self.store.resolve_course_name(name).await? {
                Some(title) => filter.course_name = Some(title),
                None => return Ok(format!("No course found matching '{}'", name)),
            }
        }

        let results = match self.store.search(query, &filter, None).await {
            Ok(results) => results,
            Err(AppError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        if results.is_empty() {
            return Ok(format!(
                "No relevant content found{}.",
                requested.describe()
            ));
        }

        let mut formatted = Vec::with_capacity(results.len());
        let mut sources: Vec<Source> = Vec::new();

        for result in &results {
            let label = result.label();
            formatted.push(format!("[{}]\n{}", label, result.content));

            if sources.iter().any(|s| s.text == label) {
                continue;
            }
            let url = match result.lesson_number {
                Some(n) => self.store.lesson_link(&result.course_title, n).await?,
                None => self.store.course_link(&result.course_title).await?,
            };
            sources.push(Source::new(label, url));
        }

        self.last_sources = sources;
        Ok(formatted.join("\n\n"))
    }

    pub fn last_sources(&self) -> &[Source] {
        &self.last_sources
    }
}

/// Returns a course's title, link and lesson list.
#[derive(Clone)]
pub struct CourseOutlineTool {
    store: Arc<dyn VectorStore>,
    last_sources: Vec<Source>,
}

impl CourseOutlineTool {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            last_sources: Vec::new(),
        }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: OUTLINE_TOOL.to_string(),
            description: "Get a course outline: title, course link, instructor and the complete lesson list"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    pub async fn execute(&mut self, course_name: &str) -> AppResult<String> {
        self.last_sources.clear();

        let Some(title) = self.store.resolve_course_name(course_name).await? else {
            return Ok(format!("No course found matching '{}'", course_name));
        };
        let Some(course) = self.store.course_metadata(&title).await? else {
            return Ok(format!("Course metadata not found for '{}'", title));
        };

        let mut lines = vec![format!("Course: {}", course.title)];
        if let Some(link) = &course.course_link {
            lines.push(format!("Course Link: {}", link));
        }
        if let Some(instructor) = &course.instructor {
            lines.push(format!("Instructor: {}", instructor));
        }
        lines.push(format!("Lessons ({} total):", course.lesson_count()));
        for lesson in &course.lessons {
            lines.push(format!("{}. {}", lesson.lesson_number, lesson.title));
        }

        self.last_sources = vec![Source::new(course.title.clone(), course.course_link.clone())];
        Ok(lines.join("\n"))
    }

    pub fn last_sources(&self) -> &[Source] {
        &self.last_sources
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_lesson_number")]
    lesson_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Models sometimes send numbers as strings.
fn lenient_lesson_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid lesson_number: {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid lesson_number: '{}'", s))),
        other => Err(D::Error::custom(format!(
            "invalid lesson_number: {}",
            other
        ))),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: &Value) -> AppResult<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| AppError::Knowledge(format!("Invalid arguments for '{}': {}", tool, e)))
}

/// Every tool kind the assistant can offer.
#[derive(Clone)]
pub enum Tool {
    Search(CourseSearchTool),
    Outline(CourseOutlineTool),
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => SEARCH_TOOL,
            Self::Outline(_) => OUTLINE_TOOL,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            Self::Search(_) => CourseSearchTool::definition(),
            Self::Outline(_) => CourseOutlineTool::definition(),
        }
    }

    /// Parse the model's JSON arguments and run the tool.
    pub async fn execute(&mut self, args: &Value) -> AppResult<String> {
        match self {
            Self::Search(tool) => {
                tool.last_sources.clear();
                let args: SearchArgs = parse_args(SEARCH_TOOL, args)?;
                tool.execute(&args.query, args.course_name.as_deref(), args.lesson_number)
                    .await
            }
            Self::Outline(tool) => {
                tool.last_sources.clear();
                let args: OutlineArgs = parse_args(OUTLINE_TOOL, args)?;
                tool.execute(&args.course_name).await
            }
        }
    }

    pub fn last_sources(&self) -> &[Source] {
        match self {
            Self::Search(tool) => tool.last_sources(),
            Self::Outline(tool) => tool.last_sources(),
        }
    }

    fn reset_sources(&mut self) {
        match self {
            Self::Search(tool) => tool.last_sources.clear(),
            Self::Outline(tool) => tool.last_sources.clear(),
        }
    }
}

/// Registry of tools plus the sources of the last execution.
#[derive(Clone, Default)]
pub struct ToolManager {
    tools: BTreeMap<String, Tool>,
    last_sources: Vec<Source>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the search and outline tools over `store`.
    pub fn with_course_tools(store: Arc<dyn VectorStore>) -> Self {
        let mut manager = Self::new();
        manager.register_tool(Tool::Search(CourseSearchTool::new(Arc::clone(&store))));
        manager.register_tool(Tool::Outline(CourseOutlineTool::new(store)));
        manager
    }

    /// Register `tool` under `name`, which must be the tool's own name.
    pub fn register(&mut self, name: &str, tool: Tool) -> AppResult<()> {
        if name != tool.name() {
            return Err(AppError::Config(format!(
                "Tool registered as '{}' but defines itself as '{}'",
                name,
                tool.name()
            )));
        }
        self.register_tool(tool);
        Ok(())
    }

    pub fn register_tool(&mut self, tool: Tool) {
        tracing::debug!("Registered tool '{}'", tool.name());
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(Tool::definition).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a registered tool by name.
    ///
    /// The manager's sources are replaced by that tool's sources, even
    /// when the tool fails (leaving them empty).
    pub async fn execute(&mut self, name: &str, args: &Value) -> AppResult<String> {
        let tool = self
            .tools
            .get_mut(name)
            .ok_or_else(|| AppError::UnknownTool(name.to_string()))?;

        tracing::debug!("Executing tool '{}' with {}", name, args);
        let result = tool.execute(args).await;
        self.last_sources = tool.last_sources().to_vec();
        result
    }

    pub fn last_sources(&self) -> &[Source] {
        &self.last_sources
    }

    pub fn reset_sources(&mut self) {
        self.last_sources.clear();
        for tool in self.tools.values_mut() {
            tool.reset_sources();
        }
    }

    /// Copy of this manager with empty sources, for one request.
    pub fn fork(&self) -> Self {
        let mut forked = self.clone();
        forked.reset_sources();
        forked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::{Course, CourseChunk, Lesson};
    use crate::vector_store::SqliteVectorStore;

    const TITLE: &str = "Introduction to Retrieval";

    async fn store() -> Arc<dyn VectorStore> {
        let store = SqliteVectorStore::open_in_memory(
            Arc::new(TrigramProvider::new("trigram-v1", 384)),
            5,
        )
        .unwrap();

        store
            .add_course_metadata(&Course {
                title: TITLE.to_string(),
                course_link: Some("https://example.com/retrieval".to_string()),
                instructor: Some("Ada Lovelace".to_string()),
                lessons: vec![
                    Lesson {
                        lesson_number: 1,
                        title: "Embeddings".to_string(),
                        lesson_link: Some("https://example.com/retrieval/1".to_string()),
                    },
                    Lesson {
                        lesson_number: 2,
                        title: "Reranking".to_string(),
                        lesson_link: Some("https://example.com/retrieval/2".to_string()),
                    },
                ],
            })
            .await
            .unwrap();
        store
            .add_course_content(&[
                CourseChunk {
                    content: "Embeddings map text into vectors.".to_string(),
                    course_title: TITLE.to_string(),
                    lesson_number: Some(1),
                    chunk_index: 0,
                },
                CourseChunk {
                    content: "Reranking reorders candidate passages.".to_string(),
                    course_title: TITLE.to_string(),
                    lesson_number: Some(2),
                    chunk_index: 1,
                },
            ])
            .await
            .unwrap();

        Arc::new(store)
    }

    #[tokio::test]
    async fn test_search_formats_results_and_sources() {
        let mut tool = CourseSearchTool::new(store().await);
        let output = tool
            .execute("reranking passages", Some("Retrieval"), Some(2))
            .await
            .unwrap();

        assert_eq!(
            output,
            "[Introduction to Retrieval - Lesson 2]\nReranking reorders candidate passages."
        );
        assert_eq!(
            tool.last_sources(),
            &[Source::new(
                "Introduction to Retrieval - Lesson 2",
                Some("https://example.com/retrieval/2".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_search_no_results_is_message() {
        let mut tool = CourseSearchTool::new(store().await);
        let output = tool
            .execute("anything", Some("Retrieval"), Some(7))
            .await
            .unwrap();

        assert_eq!(
            output,
            "No relevant content found in course 'Retrieval' in lesson 7."
        );
        assert!(tool.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_search_unknown_course_is_message() {
        let mut tool = CourseSearchTool::new(store().await);
        let output = tool.execute("anything", Some("zzzz qqqq"), None).await.unwrap();

        assert_eq!(output, "No course found matching 'zzzz qqqq'");
        assert!(tool.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_outline() {
        let mut tool = CourseOutlineTool::new(store().await);
        let output = tool.execute("retrieval").await.unwrap();

        assert_eq!(
            output,
            "Course: Introduction to Retrieval\n\
             Course Link: https://example.com/retrieval\n\
             Instructor: Ada Lovelace\n\
             Lessons (2 total):\n\
             1. Embeddings\n\
             2. Reranking"
        );
        assert_eq!(tool.last_sources()[0].text, TITLE);
    }

    #[tokio::test]
    async fn test_manager_unknown_tool() {
        let mut manager = ToolManager::with_course_tools(store().await);
        let err = manager
            .execute("delete_everything", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownTool(_)));
        assert_eq!(err.to_string(), "Tool 'delete_everything' not found");
    }

    #[tokio::test]
    async fn test_manager_sources_reflect_last_execution() {
        let mut manager = ToolManager::with_course_tools(store().await);

        manager
            .execute(SEARCH_TOOL, &json!({"query": "embeddings vectors", "lesson_number": 1}))
            .await
            .unwrap();
        assert_eq!(
            manager.last_sources()[0].text,
            "Introduction to Retrieval - Lesson 1"
        );

        manager
            .execute(SEARCH_TOOL, &json!({"query": "reranking", "lesson_number": "2"}))
            .await
            .unwrap();
        let texts: Vec<&str> = manager.last_sources().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Introduction to Retrieval - Lesson 2"]);

        manager.reset_sources();
        assert!(manager.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_manager_invalid_arguments() {
        let mut manager = ToolManager::with_course_tools(store().await);
        let err = manager
            .execute(SEARCH_TOOL, &json!({"course_name": "Retrieval"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Knowledge(_)));
        assert!(manager.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_register_checks_name() {
        let store = store().await;
        let mut manager = ToolManager::new();

        let err = manager
            .register(OUTLINE_TOOL, Tool::Search(CourseSearchTool::new(Arc::clone(&store))))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        manager
            .register(SEARCH_TOOL, Tool::Search(CourseSearchTool::new(store)))
            .unwrap();
        let names: Vec<String> = manager.tool_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec![SEARCH_TOOL.to_string()]);
    }

    #[tokio::test]
    async fn test_fork_has_independent_sources() {
        let mut manager = ToolManager::with_course_tools(store().await);
        manager
            .execute(OUTLINE_TOOL, &json!({"course_name": "Retrieval"}))
            .await
            .unwrap();

        let forked = manager.fork();
        assert!(forked.last_sources().is_empty());
        assert_eq!(manager.last_sources().len(), 1);
        assert_eq!(forked.tool_definitions().len(), 2);
    }

    #[test]
    fn test_lenient_lesson_number() {
        let args: SearchArgs =
            serde_json::from_value(json!({"query": "q", "lesson_number": " 3 "})).unwrap();
        assert_eq!(args.lesson_number, Some(3));

        let args: SearchArgs = serde_json::from_value(json!({"query": "q"})).unwrap();
        assert_eq!(args.lesson_number, None);

        let args: SearchArgs =
            serde_json::from_value(json!({"query": "q", "lesson_number": null})).unwrap();
        assert_eq!(args.lesson_number, None);

        assert!(
            serde_json::from_value::<SearchArgs>(json!({"query": "q", "lesson_number": -1}))
                .is_err()
        );
    }
}
