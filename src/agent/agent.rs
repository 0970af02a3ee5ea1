//! Agent handle: a remote assistant id plus local tools and contexts.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use bon::bon;

use super::pool::ContextPool;
use crate::context::ConversationContext;
use crate::remote::{Attachment, HostedTool};
use crate::tools::Tool;

struct AgentInner {
    id: String,
    name: String,
    description: String,
    hosted_tools: Vec<HostedTool>,
    tools: RwLock<Vec<Arc<dyn Tool>>>,
    pool: ContextPool,
}

/// A collaborator backed by a remote assistant.
///
/// Cloning yields another handle to the same agent, sharing its tools and
/// its context pool.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

#[bon]
impl Agent {
    /// `id` is the remote assistant id runs are bound to.
    #[builder]
    pub fn new(
        #[builder(into)] id: String,
        #[builder(into)] name: String,
        #[builder(into, default)] description: String,
        #[builder(default)] tools: Vec<Arc<dyn Tool>>,
        #[builder(default)] hosted_tools: Vec<HostedTool>,
    ) -> Self {
        Self {
            inner: Arc::new(AgentInner {
                id,
                name,
                description,
                hosted_tools,
                tools: RwLock::new(tools),
                pool: ContextPool::new(),
            }),
        }
    }
}

impl Agent {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn hosted_tools(&self) -> &[HostedTool] {
        &self.inner.hosted_tools
    }

    /// Registered tools, in registration order.
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.inner
            .tools
            .read()
            .map(|tools| tools.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Look up a tool by exact name.
    pub fn tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools().into_iter().find(|t| t.name() == name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools().iter().map(|t| t.name().to_string()).collect()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn add_tool(&self, tool: Arc<dyn Tool>) {
        let mut tools = self
            .inner
            .tools
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tools.retain(|t| t.name() != tool.name());
        tools.push(tool);
    }

    /// Contexts this agent keeps between turns.
    pub fn contexts(&self) -> &ContextPool {
        &self.inner.pool
    }

    pub fn add_context(&self, context: ConversationContext) -> bool {
        self.inner.pool.add(context)
    }

    pub fn remove_context(&self, id: &str) -> Option<ConversationContext> {
        self.inner.pool.remove(id)
    }

    /// Attach uploaded files to a message for this agent's hosted tools.
    ///
    /// Falls back to file search when the agent has no hosted tools.
    pub fn attachments_for(&self, file_ids: &[String]) -> Vec<Attachment> {
        let mut seen = HashSet::new();
        let mut tools: Vec<HostedTool> = self
            .inner
            .hosted_tools
            .iter()
            .copied()
            .filter(|t| seen.insert(*t))
            .collect();
        if tools.is_empty() {
            tools.push(HostedTool::FileSearch);
        }
        file_ids
            .iter()
            .map(|id| Attachment::new(id.clone(), tools.clone()))
            .collect()
    }

    /// Non-owning handle, for tools that refer back to agents.
    pub fn downgrade(&self) -> WeakAgent {
        WeakAgent {
            name: self.inner.name.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn same_as(&self, other: &Agent) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("tools", &self.tool_names())
            .field("contexts", &self.inner.pool.len())
            .finish()
    }
}

/// Weak reference to an [`Agent`]; does not keep its pool alive.
#[derive(Clone)]
pub struct WeakAgent {
    name: String,
    inner: Weak<AgentInner>,
}

impl WeakAgent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upgrade(&self) -> Option<Agent> {
        self.inner.upgrade().map(|inner| Agent { inner })
    }
}

impl fmt::Debug for WeakAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakAgent").field(&self.name).finish()
    }
}
