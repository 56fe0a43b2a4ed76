//! Field names for the EDAM structures carried by a sync chunk
//!
//! The wire only carries field ids. These tables give the ids their EDAM
//! names so artifacts stay readable. Ids missing from a table are kept
//! under a `field_<id>` key, so a newer server schema never loses data.

/// Names for one struct type
#[derive(Debug)]
pub struct StructSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSchema],
}

/// One field of a struct
#[derive(Debug)]
pub struct FieldSchema {
    pub id: i16,
    pub name: &'static str,
    /// Schema of the field's struct value, or of its list/set elements or map values
    pub nested: Option<&'static StructSchema>,
}

impl StructSchema {
    pub fn field(&self, id: i16) -> Option<&'static FieldSchema> {
        self.fields.iter().find(|f| f.id == id)
    }
}

const fn scalar(id: i16, name: &'static str) -> FieldSchema {
    FieldSchema {
        id,
        name,
        nested: None,
    }
}

const fn nested(id: i16, name: &'static str, schema: &'static StructSchema) -> FieldSchema {
    FieldSchema {
        id,
        name,
        nested: Some(schema),
    }
}

pub static SYNC_STATE: StructSchema = StructSchema {
    name: "SyncState",
    fields: &[
        scalar(1, "currentTime"),
        scalar(2, "fullSyncBefore"),
        scalar(3, "updateCount"),
        scalar(4, "uploaded"),
        scalar(5, "userLastUpdated"),
        scalar(6, "userMaxMessageEventId"),
    ],
};

pub static SYNC_CHUNK: StructSchema = StructSchema {
    name: "SyncChunk",
    fields: &[
        scalar(1, "currentTime"),
        scalar(2, "chunkHighUSN"),
        scalar(3, "updateCount"),
        nested(4, "notes", &NOTE),
        nested(5, "notebooks", &NOTEBOOK),
        nested(6, "tags", &TAG),
        nested(7, "searches", &SAVED_SEARCH),
        nested(8, "resources", &RESOURCE),
        scalar(9, "expungedNotes"),
        scalar(10, "expungedNotebooks"),
        scalar(11, "expungedTags"),
        scalar(12, "expungedSearches"),
        nested(13, "linkedNotebooks", &LINKED_NOTEBOOK),
        scalar(14, "expungedLinkedNotebooks"),
    ],
};

pub static NOTE: StructSchema = StructSchema {
    name: "Note",
    fields: &[
        scalar(1, "guid"),
        scalar(2, "title"),
        scalar(3, "content"),
        scalar(4, "contentHash"),
        scalar(5, "contentLength"),
        scalar(6, "created"),
        scalar(7, "updated"),
        scalar(8, "deleted"),
        scalar(9, "active"),
        scalar(10, "updateSequenceNum"),
        scalar(11, "notebookGuid"),
        scalar(12, "tagGuids"),
        nested(13, "resources", &RESOURCE),
        nested(14, "attributes", &NOTE_ATTRIBUTES),
        scalar(15, "tagNames"),
    ],
};

pub static NOTE_ATTRIBUTES: StructSchema = StructSchema {
    name: "NoteAttributes",
    fields: &[
        scalar(1, "subjectDate"),
        scalar(10, "latitude"),
        scalar(11, "longitude"),
        scalar(12, "altitude"),
        scalar(13, "author"),
        scalar(14, "source"),
        scalar(15, "sourceURL"),
        scalar(16, "sourceApplication"),
        scalar(17, "shareDate"),
        scalar(18, "reminderOrder"),
        scalar(19, "reminderDoneTime"),
        scalar(20, "reminderTime"),
        scalar(21, "placeName"),
        scalar(22, "contentClass"),
        nested(23, "applicationData", &LAZY_MAP),
        scalar(24, "lastEditedBy"),
        scalar(26, "classifications"),
        scalar(27, "creatorId"),
        scalar(28, "lastEditorId"),
    ],
};

pub static LAZY_MAP: StructSchema = StructSchema {
    name: "LazyMap",
    fields: &[scalar(1, "keysOnly"), scalar(2, "fullMap")],
};

pub static DATA: StructSchema = StructSchema {
    name: "Data",
    fields: &[scalar(1, "bodyHash"), scalar(2, "size"), scalar(3, "body")],
};

pub static RESOURCE: StructSchema = StructSchema {
    name: "Resource",
    fields: &[
        scalar(1, "guid"),
        scalar(2, "noteGuid"),
        nested(3, "data", &DATA),
        scalar(4, "mime"),
        scalar(5, "width"),
        scalar(6, "height"),
        scalar(7, "duration"),
        scalar(8, "active"),
        nested(9, "recognition", &DATA),
        nested(11, "attributes", &RESOURCE_ATTRIBUTES),
        scalar(12, "updateSequenceNum"),
        nested(13, "alternateData", &DATA),
    ],
};

pub static RESOURCE_ATTRIBUTES: StructSchema = StructSchema {
    name: "ResourceAttributes",
    fields: &[
        scalar(1, "sourceURL"),
        scalar(2, "timestamp"),
        scalar(3, "latitude"),
        scalar(4, "longitude"),
        scalar(5, "altitude"),
        scalar(6, "cameraMake"),
        scalar(7, "cameraModel"),
        scalar(8, "clientWillIndex"),
        scalar(9, "recoType"),
        scalar(10, "fileName"),
        scalar(11, "attachment"),
        nested(12, "applicationData", &LAZY_MAP),
    ],
};

pub static NOTEBOOK: StructSchema = StructSchema {
    name: "Notebook",
    fields: &[
        scalar(1, "guid"),
        scalar(2, "name"),
        scalar(5, "updateSequenceNum"),
        scalar(6, "defaultNotebook"),
        scalar(7, "serviceCreated"),
        scalar(8, "serviceUpdated"),
        nested(10, "publishing", &PUBLISHING),
        scalar(11, "published"),
        scalar(12, "stack"),
        scalar(13, "sharedNotebookIds"),
        nested(14, "sharedNotebooks", &SHARED_NOTEBOOK),
        nested(15, "businessNotebook", &BUSINESS_NOTEBOOK),
        nested(16, "contact", &USER),
        nested(17, "restrictions", &NOTEBOOK_RESTRICTIONS),
    ],
};

pub static PUBLISHING: StructSchema = StructSchema {
    name: "Publishing",
    fields: &[
        scalar(1, "uri"),
        scalar(2, "order"),
        scalar(3, "ascending"),
        scalar(4, "publicDescription"),
    ],
};

pub static SHARED_NOTEBOOK: StructSchema = StructSchema {
    name: "SharedNotebook",
    fields: &[
        scalar(1, "id"),
        scalar(2, "userId"),
        scalar(3, "notebookGuid"),
        scalar(4, "email"),
        scalar(7, "serviceCreated"),
        scalar(10, "serviceUpdated"),
        scalar(11, "privilege"),
    ],
};

pub static BUSINESS_NOTEBOOK: StructSchema = StructSchema {
    name: "BusinessNotebook",
    fields: &[
        scalar(1, "notebookDescription"),
        scalar(2, "privilege"),
        scalar(3, "recommended"),
    ],
};

pub static USER: StructSchema = StructSchema {
    name: "User",
    fields: &[
        scalar(1, "id"),
        scalar(2, "username"),
        scalar(3, "email"),
        scalar(4, "name"),
    ],
};

pub static NOTEBOOK_RESTRICTIONS: StructSchema = StructSchema {
    name: "NotebookRestrictions",
    fields: &[
        scalar(1, "noReadNotes"),
        scalar(2, "noCreateNotes"),
        scalar(3, "noUpdateNotes"),
        scalar(4, "noExpungeNotes"),
        scalar(5, "noShareNotes"),
        scalar(6, "noEmailNotes"),
        scalar(7, "noSendMessageToRecipients"),
        scalar(8, "noUpdateNotebook"),
        scalar(9, "noExpungeNotebook"),
        scalar(10, "noSetDefaultNotebook"),
        scalar(11, "noSetNotebookStack"),
        scalar(12, "noPublishToPublic"),
        scalar(13, "noPublishToBusinessLibrary"),
        scalar(14, "noCreateTags"),
        scalar(15, "noUpdateTags"),
        scalar(16, "noExpungeTags"),
        scalar(17, "noSetParentTag"),
        scalar(18, "noCreateSharedNotebooks"),
    ],
};

pub static TAG: StructSchema = StructSchema {
    name: "Tag",
    fields: &[
        scalar(1, "guid"),
        scalar(2, "name"),
        scalar(3, "parentGuid"),
        scalar(4, "updateSequenceNum"),
    ],
};

pub static SAVED_SEARCH: StructSchema = StructSchema {
    name: "SavedSearch",
    fields: &[
        scalar(1, "guid"),
        scalar(2, "name"),
        scalar(3, "query"),
        scalar(4, "format"),
        scalar(5, "updateSequenceNum"),
        nested(6, "scope", &SAVED_SEARCH_SCOPE),
    ],
};

pub static SAVED_SEARCH_SCOPE: StructSchema = StructSchema {
    name: "SavedSearchScope",
    fields: &[
        scalar(1, "includeAccount"),
        scalar(2, "includePersonalLinkedNotebooks"),
        scalar(3, "includeBusinessLinkedNotebooks"),
    ],
};

pub static LINKED_NOTEBOOK: StructSchema = StructSchema {
    name: "LinkedNotebook",
    fields: &[
        scalar(2, "shareName"),
        scalar(3, "username"),
        scalar(4, "shardId"),
        scalar(5, "sharedNotebookGlobalId"),
        scalar(6, "uri"),
        scalar(7, "guid"),
        scalar(8, "updateSequenceNum"),
        scalar(9, "noteStoreUrl"),
        scalar(10, "webApiUrlPrefix"),
        scalar(11, "stack"),
        scalar(12, "businessId"),
    ],
};
