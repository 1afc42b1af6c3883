//! The DTD data model. Pure data — no I/O, no entity expansion. Built
//! once (fed already-expanded declaration text) and shared read-only
//! afterwards: a parsed `Dtd` is immutable after construction and may
//! be shared safely across parser instances.

use std::collections::{HashMap, HashSet, VecDeque};

/// `type` of an `ATTLIST` attribute definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttType {
    Cdata,
    Id,
    IdRef,
    IdRefs,
    Name,
    Names,
    NmToken,
    NmTokens,
    Number,
    Numbers,
    NuToken,
    NuTokens,
    Entity,
    Entities,
    Notation(Vec<String>),
    Enumeration(Vec<String>),
}

/// `#FIXED` / `#REQUIRED` / `#IMPLIED` / plain default presence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Default,
    Fixed,
    Required,
    Implied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttDef {
    pub name: String,
    pub ty: AttType,
    pub presence: Presence,
    pub default: Option<String>,
}

impl AttDef {
    pub fn new(name: impl Into<String>, ty: AttType, presence: Presence, default: Option<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            presence,
            default,
        }
    }
}

/// Connector joining the members of a content-model [`Group`]. A group's
/// connector is uniform; mixing `,`, `|` and `&` in one group is a parse
/// error (invariant), enforced while the group is being built
/// (see [`crate::content`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connector {
    Sequence,
    Or,
    And,
    /// A group with a single member and no connector yet (or a leaf).
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occurrence {
    Required,
    Optional,
    OneOrMore,
    ZeroOrMore,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupMember {
    Name(String),
    Group(Box<Group>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub members: Vec<GroupMember>,
    pub connector: Connector,
    pub occurrence: Occurrence,
    /// Set when `#PCDATA` appears as (or among) the group's members.
    pub mixed: bool,
}

impl Group {
    pub fn leaf(name: impl Into<String>, occurrence: Occurrence) -> Self {
        Group {
            members: vec![GroupMember::Name(name.into())],
            connector: Connector::None,
            occurrence,
            mixed: false,
        }
    }

    /// Every element name directly named anywhere in this group (recursing
    /// into nested groups), used to answer "can this content model admit a
    /// child named X" without building a full regular content-model
    /// automaton — sufficient for a forgiving parser that only asks
    /// "allowed at all", never "valid at this exact position".
    pub fn collect_names(&self, out: &mut HashSet<String>) {
        for member in &self.members {
            match member {
                GroupMember::Name(name) => {
                    out.insert(name.to_ascii_uppercase());
                }
                GroupMember::Group(group) => group.collect_names(out),
            }
        }
    }
}

/// `EMPTY` / `CDATA` / `RCDATA` declared content, or `Default` meaning the
/// element has a real (possibly mixed) content model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredContent {
    Default,
    Empty,
    CData,
    RcData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentModel {
    pub declared_content: DeclaredContent,
    /// `None` for `ANY` and for declared-content elements; `Some` for a
    /// structured or mixed (`#PCDATA`) model.
    pub group: Option<Group>,
    /// `<!ELEMENT x ANY>` — any element may occur; distinct from `group:
    /// None` with `Default` declared content, which means "undeclared
    /// content, treat conservatively" for an element that was never given
    /// an explicit content spec at all (should not normally occur once a
    /// declaration parsed successfully, but external subsets can be
    /// partial).
    pub any: bool,
}

impl ContentModel {
    pub fn empty() -> Self {
        ContentModel {
            declared_content: DeclaredContent::Empty,
            group: None,
            any: false,
        }
    }

    pub fn any() -> Self {
        ContentModel {
            declared_content: DeclaredContent::Default,
            group: None,
            any: true,
        }
    }

    pub fn can_contain_pcdata(&self) -> bool {
        if self.any {
            return true;
        }
        match self.declared_content {
            DeclaredContent::CData | DeclaredContent::RcData => true,
            DeclaredContent::Empty => false,
            DeclaredContent::Default => self.group.as_ref().map_or(false, |g| g.mixed),
        }
    }

    pub fn allows_child(&self, name: &str) -> bool {
        if self.any {
            return true;
        }
        match &self.group {
            Some(group) => {
                let mut names = HashSet::new();
                group.collect_names(&mut names);
                names.contains(&name.to_ascii_uppercase())
            }
            None => false,
        }
    }

    /// Every element name this content model can admit as a direct child,
    /// in a fixed (sorted) order so callers that walk children one at a
    /// time, such as [`Dtd::find_optional_container_chain`]'s breadth-first
    /// search, produce the same result on every run.
    pub fn child_names(&self) -> Vec<String> {
        let mut names = HashSet::new();
        if let Some(group) = &self.group {
            group.collect_names(&mut names);
        }
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names
    }

    /// For a top-level sequence model (e.g. HTML's `(HEAD, BODY)`), every
    /// member name that must appear, in document order, before `target`.
    /// Used to auto-insert a required sibling the forgiving parser never
    /// saw a start tag for (HEAD before an explicit BODY). Gives up past
    /// the first nested group, since that's as far as a flat "allowed at
    /// all" content model can answer an ordering question.
    pub fn required_predecessors(&self, target: &str) -> Vec<String> {
        let group = match &self.group {
            Some(group) if group.connector == Connector::Sequence => group,
            _ => return Vec::new(),
        };
        let mut result = Vec::new();
        for member in &group.members {
            match member {
                GroupMember::Name(name) => {
                    if name.eq_ignore_ascii_case(target) {
                        break;
                    }
                    result.push(name.to_ascii_uppercase());
                }
                GroupMember::Group(inner) if inner.connector == Connector::None && inner.members.len() == 1 => {
                    match &inner.members[0] {
                        GroupMember::Name(name) if name.eq_ignore_ascii_case(target) => break,
                        GroupMember::Name(name) => {
                            if matches!(inner.occurrence, Occurrence::Required | Occurrence::OneOrMore) {
                                result.push(name.to_ascii_uppercase());
                            }
                        }
                        GroupMember::Group(_) => break,
                    }
                }
                GroupMember::Group(_) => break,
            }
        }
        result
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementDecl {
    /// Stored uppercase ("Element names are stored
    /// uppercased").
    pub name: String,
    pub start_tag_optional: bool,
    pub end_tag_optional: bool,
    pub content_model: ContentModel,
    pub inclusions: HashSet<String>,
    pub exclusions: HashSet<String>,
    pub attlist: HashMap<String, AttDef>,
}

impl ElementDecl {
    pub fn new(name: impl Into<String>, content_model: ContentModel) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            start_tag_optional: false,
            end_tag_optional: false,
            content_model,
            inclusions: HashSet::new(),
            exclusions: HashSet::new(),
            attlist: HashMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttDef> {
        self.attlist.get(&name.to_ascii_uppercase())
    }
}

/// `CDATA` / `SDATA` / `PI` literal typing of an internal entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralType {
    Cdata,
    Sdata,
    Pi,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityValue {
    Internal {
        literal: String,
        literal_type: Option<LiteralType>,
    },
    External {
        public_id: Option<String>,
        system_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDef {
    pub name: String,
    pub value: EntityValue,
}

/// The immutable, shareable DTD built by [`crate::parser::DtdBuilder`].
#[derive(Clone, Debug, Default)]
pub struct Dtd {
    elements: HashMap<String, ElementDecl>,
    general_entities: HashMap<String, EntityDef>,
    parameter_entities: HashMap<String, EntityDef>,
}

impl Dtd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_element(&mut self, decl: ElementDecl) {
        self.elements.insert(decl.name.clone(), decl);
    }

    pub fn element_mut(&mut self, name: &str) -> Option<&mut ElementDecl> {
        self.elements.get_mut(&name.to_ascii_uppercase())
    }

    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(&name.to_ascii_uppercase())
    }

    pub fn elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.elements.values()
    }

    pub fn insert_general_entity(&mut self, entity: EntityDef) -> bool {
        let key = entity.name.clone();
        self.general_entities.insert(key, entity).is_some()
    }

    pub fn insert_parameter_entity(&mut self, entity: EntityDef) -> bool {
        let key = entity.name.clone();
        self.parameter_entities.insert(key, entity).is_some()
    }

    pub fn general_entity(&self, name: &str) -> Option<&EntityDef> {
        self.general_entities.get(name)
    }

    pub fn parameter_entity(&self, name: &str) -> Option<&EntityDef> {
        self.parameter_entities.get(name)
    }

    /// Implements `FindOptionalContainers`: breadth-first
    /// search from `from`'s allowed children, over elements whose *start*
    /// tag is optional, for the shortest chain of element names that ends
    /// on an element satisfying `accept`. Each declaration is visited at
    /// most once.
    pub fn find_optional_container_chain(
        &self,
        from: &str,
        accept: impl Fn(&ElementDecl) -> bool,
    ) -> Option<Vec<String>> {
        let start = self.element(from)?;
        if accept(start) {
            return Some(Vec::new());
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.name.clone());

        let mut queue: VecDeque<(String, Vec<String>)> = VecDeque::new();
        for child in start.content_model.child_names() {
            if !visited.contains(&child) {
                queue.push_back((child.clone(), vec![child.clone()]));
            }
        }

        while let Some((name, chain)) = queue.pop_front() {
            if visited.contains(&name) {
                continue;
            }
            visited.insert(name.clone());

            let decl = match self.element(&name) {
                Some(decl) => decl,
                None => continue,
            };

            // Every element in the synthesized chain is itself being
            // invented, so it must be legal to omit its start tag --
            // including the chain's terminus (unlike `from`, which is
            // already open and not being synthesized).
            if !decl.start_tag_optional {
                continue;
            }

            if accept(decl) {
                return Some(chain);
            }

            for child in decl.content_model.child_names() {
                if !visited.contains(&child) {
                    let mut next = chain.clone();
                    next.push(child.clone());
                    queue.push_back((child, next));
                }
            }
        }

        None
    }
}
