use std::collections::HashMap;

/// The routing trie. Maps HTTP paths + methods to handlers.
#[derive(Debug)]
pub struct Router<H> {
    root: Node<H>,
}

/// A single node in the trie.
#[derive(Debug)]
struct Node<H> {
    /// Children keyed by segment name.
    children: HashMap<String, Node<H>>,
    /// Method-to-handler mapping at this terminal node.
    methods: HashMap<String, H>,
}

impl<H> Default for Node<H> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self {
            root: Node::default(),
        }
    }
}

/// The result of a route lookup.
#[derive(Debug)]
pub enum RouteMatch<'a, H> {
    /// Matched a path and method.
    Found(&'a H),
    /// Path matched but method is not allowed.
    MethodNotAllowed { allowed: Vec<String> },
    /// No path matched.
    NotFound,
}

impl<H> Router<H> {
    /// Create a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the one it replaced.
    ///
    /// The path is normalized; the method is uppercased.
    pub fn insert(&mut self, path: &str, method: &str, handler: H) -> Option<H> {
        let normalized = normalize_path(path);
        let mut current = &mut self.root;
        for segment in segments(&normalized) {
            current = current.children.entry(segment.to_string()).or_default();
        }
        current.methods.insert(method.to_uppercase(), handler)
    }

    /// Look up a request path and method.
    pub fn lookup(&self, path: &str, method: &str) -> RouteMatch<'_, H> {
        let normalized = normalize_path(path);
        let mut current = &self.root;
        for segment in segments(&normalized) {
            match current.children.get(segment) {
                Some(child) => current = child,
                None => return RouteMatch::NotFound,
            }
        }

        if let Some(handler) = current.methods.get(&method.to_uppercase()) {
            RouteMatch::Found(handler)
        } else if current.methods.is_empty() {
            // intermediate node, not a registered path
            RouteMatch::NotFound
        } else {
            let mut allowed: Vec<String> = current.methods.keys().cloned().collect();
            allowed.sort();
            RouteMatch::MethodNotAllowed { allowed }
        }
    }

    /// Number of registered (path, method) pairs.
    pub fn len(&self) -> usize {
        fn count<H>(node: &Node<H>) -> usize {
            node.methods.len() + node.children.values().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize a request path: strip trailing slashes, collapse double slashes.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut prev_slash = false;

    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(ch);
            prev_slash = false;
        }
    }

    // Strip trailing slash (but keep root "/")
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized
    }
}
