//! crates/content_ingest_core/src/hierarchy.rs
//!
//! The content hierarchy of a course: an ordered list of operator-created
//! folders, each holding typed item collections and at most one level of
//! subfolders.
//!
//! Nodes live in an arena and are addressed internally by `NodeId`. Callers
//! address them positionally (folder index, then an explicit `Target`), which
//! is how the authoring form refers to them.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ContentItem, Document, ExternalVideo, Image, ItemCollection, TextBlock, Video,
};
use crate::error::{IngestError, IngestResult};

//=========================================================================================
// Addressing
//=========================================================================================

/// A stable handle to a node in the arena. Never reused after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Which level of a folder an item-level operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The folder's own collections.
    Folder,
    /// The collections of the folder's subfolder at this index.
    Subfolder(usize),
}

//=========================================================================================
// Item Collections
//=========================================================================================

/// The typed, ordered collections held by one node. Order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemCollections {
    pub videos: Vec<Video>,
    pub documents: Vec<Document>,
    pub images: Vec<Image>,
    pub text_blocks: Vec<TextBlock>,
    pub external_videos: Vec<ExternalVideo>,
}

impl ItemCollections {
    /// Appends an item to its collection and returns its position there.
    fn push(&mut self, item: ContentItem) -> usize {
        fn append<T>(items: &mut Vec<T>, item: T) -> usize {
            items.push(item);
            items.len() - 1
        }
        match item {
            ContentItem::Video(v) => append(&mut self.videos, v),
            ContentItem::Document(d) => append(&mut self.documents, d),
            ContentItem::Image(i) => append(&mut self.images, i),
            ContentItem::TextBlock(t) => append(&mut self.text_blocks, t),
            ContentItem::ExternalVideo(e) => append(&mut self.external_videos, e),
        }
    }

    fn remove(&mut self, collection: ItemCollection, index: usize) -> IngestResult<ContentItem> {
        fn take<T>(items: &mut Vec<T>, index: usize, what: &'static str) -> IngestResult<T> {
            if index < items.len() {
                Ok(items.remove(index))
            } else {
                Err(IngestError::Index { what, index, len: items.len() })
            }
        }
        let what = collection.as_str();
        match collection {
            ItemCollection::Videos => take(&mut self.videos, index, what).map(ContentItem::Video),
            ItemCollection::Documents => {
                take(&mut self.documents, index, what).map(ContentItem::Document)
            }
            ItemCollection::Images => take(&mut self.images, index, what).map(ContentItem::Image),
            ItemCollection::TextBlocks => {
                take(&mut self.text_blocks, index, what).map(ContentItem::TextBlock)
            }
            ItemCollection::ExternalVideos => {
                take(&mut self.external_videos, index, what).map(ContentItem::ExternalVideo)
            }
        }
    }

    pub fn len(&self, collection: ItemCollection) -> usize {
        match collection {
            ItemCollection::Videos => self.videos.len(),
            ItemCollection::Documents => self.documents.len(),
            ItemCollection::Images => self.images.len(),
            ItemCollection::TextBlocks => self.text_blocks.len(),
            ItemCollection::ExternalVideos => self.external_videos.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
            && self.documents.is_empty()
            && self.images.is_empty()
            && self.text_blocks.is_empty()
            && self.external_videos.is_empty()
    }
}

//=========================================================================================
// Nodes and the Tree
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    name: String,
    remote_id: Option<String>,
    parent: Option<NodeId>,
    items: ItemCollections,
    subfolders: Vec<NodeId>,
}

impl FolderNode {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            remote_id: None,
            parent,
            items: ItemCollections::default(),
            subfolders: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `_id` the backend assigned, once the course has been saved.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    pub fn items(&self) -> &ItemCollections {
        &self.items
    }

    pub fn is_subfolder(&self) -> bool {
        self.parent.is_some()
    }

    pub fn subfolder_count(&self) -> usize {
        self.subfolders.len()
    }
}

/// The folder hierarchy being authored for one course.
#[derive(Debug, Clone, Default)]
pub struct ContentTree {
    nodes: Vec<Option<FolderNode>>,
    roots: Vec<NodeId>,
}

impl ContentTree {
    /// An empty tree, as for a brand-new course.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder_count(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Top-level folders in display order.
    pub fn folders(&self) -> impl Iterator<Item = &FolderNode> + '_ {
        self.roots.iter().filter_map(|id| self.node(*id))
    }

    /// Subfolders of the folder at `folder_index`, in display order.
    pub fn subfolders(&self, folder_index: usize) -> IngestResult<Vec<&FolderNode>> {
        let id = self.folder_id(folder_index)?;
        Ok(self
            .live(id)?
            .subfolders
            .iter()
            .filter_map(|sub| self.node(*sub))
            .collect())
    }

    pub fn node(&self, id: NodeId) -> Option<&FolderNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn folder(&self, folder_index: usize) -> IngestResult<&FolderNode> {
        let id = self.folder_id(folder_index)?;
        self.live(id)
    }

    pub fn subfolder(&self, folder_index: usize, sub_index: usize) -> IngestResult<&FolderNode> {
        let id = self.resolve(folder_index, Target::Subfolder(sub_index))?;
        self.live(id)
    }

    /// Resolves a folder index to its node id.
    pub fn folder_id(&self, folder_index: usize) -> IngestResult<NodeId> {
        self.roots.get(folder_index).copied().ok_or(IngestError::Index {
            what: "folders",
            index: folder_index,
            len: self.roots.len(),
        })
    }

    /// Checks that an item-level address exists, e.g. before starting an
    /// upload whose result will be placed there.
    pub fn check_target(&self, folder_index: usize, target: Target) -> IngestResult<NodeId> {
        self.resolve(folder_index, target)
    }

    //-------------------------------------------------------------------------------------
    // Structural operations
    //-------------------------------------------------------------------------------------

    /// Appends a new, empty top-level folder and returns its index.
    pub fn create_folder(&mut self, name: &str) -> IngestResult<usize> {
        let name = validate_name(name)?;
        let id = self.alloc(FolderNode::new(name, None));
        self.roots.push(id);
        Ok(self.roots.len() - 1)
    }

    pub fn rename_folder(&mut self, folder_index: usize, name: &str) -> IngestResult<()> {
        let name = validate_name(name)?;
        let id = self.folder_id(folder_index)?;
        self.live_mut(id)?.name = name;
        Ok(())
    }

    pub fn rename_subfolder(
        &mut self,
        folder_index: usize,
        sub_index: usize,
        name: &str,
    ) -> IngestResult<()> {
        let name = validate_name(name)?;
        let id = self.resolve(folder_index, Target::Subfolder(sub_index))?;
        self.live_mut(id)?.name = name;
        Ok(())
    }

    /// Removes a folder with all of its items and subfolders. There is no undo.
    pub fn delete_folder(&mut self, folder_index: usize) -> IngestResult<()> {
        let id = self.folder_id(folder_index)?;
        self.roots.remove(folder_index);
        self.free(id);
        Ok(())
    }

    /// Appends a new, empty subfolder to the folder at `folder_index`.
    pub fn create_subfolder(&mut self, folder_index: usize, name: &str) -> IngestResult<usize> {
        let name = validate_name(name)?;
        let parent = self.folder_id(folder_index)?;
        self.create_child(parent, name)
    }

    /// Appends a new subfolder under `parent`. Subfolders cannot nest further.
    pub fn create_subfolder_in(&mut self, parent: NodeId, name: &str) -> IngestResult<usize> {
        let name = validate_name(name)?;
        self.create_child(parent, name)
    }

    pub fn delete_subfolder(&mut self, folder_index: usize, sub_index: usize) -> IngestResult<()> {
        let sub = self.resolve(folder_index, Target::Subfolder(sub_index))?;
        let parent = self.folder_id(folder_index)?;
        self.live_mut(parent)?.subfolders.remove(sub_index);
        self.free(sub);
        Ok(())
    }

    /// Appends `item` to the matching collection at the addressed level and
    /// returns its position in that collection.
    pub fn add_item(
        &mut self,
        folder_index: usize,
        item: ContentItem,
        target: Target,
    ) -> IngestResult<usize> {
        let id = self.resolve(folder_index, target)?;
        Ok(self.live_mut(id)?.items.push(item))
    }

    /// Removes and returns one item from the addressed level.
    pub fn remove_item(
        &mut self,
        folder_index: usize,
        collection: ItemCollection,
        item_index: usize,
        target: Target,
    ) -> IngestResult<ContentItem> {
        let id = self.resolve(folder_index, target)?;
        self.live_mut(id)?.items.remove(collection, item_index)
    }

    //-------------------------------------------------------------------------------------
    // Persistence
    //-------------------------------------------------------------------------------------

    /// The nested document the backend stores for this tree.
    pub fn to_documents(&self) -> Vec<FolderDocument> {
        self.roots.iter().filter_map(|id| self.document_for(*id)).collect()
    }

    /// Rebuilds a tree from a persisted document, enforcing the same rules as
    /// the structural operations.
    pub fn from_documents(documents: Vec<FolderDocument>) -> IngestResult<Self> {
        let mut tree = Self::new();
        for doc in documents {
            let name = validate_name(&doc.name)?;
            let mut node = FolderNode::new(name, None);
            node.remote_id = doc.id;
            node.items = doc.items;
            let id = tree.alloc(node);
            tree.roots.push(id);

            for sub in doc.subfolders {
                if !sub.subfolders.is_empty() {
                    return Err(IngestError::Structural(format!(
                        "subfolder '{}' of '{}' contains subfolders",
                        sub.name, doc.name
                    )));
                }
                let name = validate_name(&sub.name)?;
                let mut child = FolderNode::new(name, Some(id));
                child.remote_id = sub.id;
                child.items = sub.items;
                let child_id = tree.alloc(child);
                tree.live_mut(id)?.subfolders.push(child_id);
            }
        }
        Ok(tree)
    }

    //-------------------------------------------------------------------------------------
    // Arena internals
    //-------------------------------------------------------------------------------------

    fn alloc(&mut self, node: FolderNode) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    fn free(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            for child in node.subfolders {
                self.free(child);
            }
        }
    }

    fn live(&self, id: NodeId) -> IngestResult<&FolderNode> {
        self.node(id)
            .ok_or_else(|| IngestError::Structural(format!("node {:?} no longer exists", id)))
    }

    fn live_mut(&mut self, id: NodeId) -> IngestResult<&mut FolderNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| IngestError::Structural(format!("node {:?} no longer exists", id)))
    }

    fn resolve(&self, folder_index: usize, target: Target) -> IngestResult<NodeId> {
        let folder = self.folder_id(folder_index)?;
        match target {
            Target::Folder => Ok(folder),
            Target::Subfolder(sub_index) => {
                let subs = &self.live(folder)?.subfolders;
                subs.get(sub_index).copied().ok_or(IngestError::Index {
                    what: "subfolders",
                    index: sub_index,
                    len: subs.len(),
                })
            }
        }
    }

    fn create_child(&mut self, parent: NodeId, name: String) -> IngestResult<usize> {
        let parent_node = self.live(parent)?;
        if parent_node.is_subfolder() {
            return Err(IngestError::Structural(format!(
                "'{}' is a subfolder and cannot contain subfolders",
                parent_node.name
            )));
        }
        let id = self.alloc(FolderNode::new(name, Some(parent)));
        let subs = &mut self.live_mut(parent)?.subfolders;
        subs.push(id);
        Ok(subs.len() - 1)
    }

    fn document_for(&self, id: NodeId) -> Option<FolderDocument> {
        let node = self.node(id)?;
        Some(FolderDocument {
            id: node.remote_id.clone(),
            name: node.name.clone(),
            items: node.items.clone(),
            subfolders: node
                .subfolders
                .iter()
                .filter_map(|sub| self.document_for(*sub))
                .collect(),
        })
    }
}

impl PartialEq for ContentTree {
    fn eq(&self, other: &Self) -> bool {
        self.to_documents() == other.to_documents()
    }
}

impl Eq for ContentTree {}

impl Serialize for ContentTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_documents().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentTree {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let documents = Vec::<FolderDocument>::deserialize(deserializer)?;
        ContentTree::from_documents(documents).map_err(serde::de::Error::custom)
    }
}

/// One folder as the backend stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub items: ItemCollections,
    #[serde(default)]
    pub subfolders: Vec<FolderDocument>,
}

fn validate_name(name: &str) -> IngestResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(IngestError::Validation("folder name must not be empty".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}
