/// Per-user Gmail quota, in units per second
pub const GMAIL_QUOTA_PER_SECOND: usize = 250;

/// Quota unit cost of each Gmail API method used by the digest
/// https://developers.google.com/gmail/api/reference/quota
#[derive(Debug, Clone, Copy)]
pub struct GmailApiQuota {
    pub messages_list: usize,
    pub messages_get: usize,
    pub messages_batch_modify: usize,
    pub get_profile: usize,
}

pub const GMAIL_API_QUOTA: GmailApiQuota = GmailApiQuota {
    messages_list: 5,
    messages_get: 5,
    messages_batch_modify: 50,
    get_profile: 1,
};

/// Maximum number of ids accepted by a single `messages.batchModify` call
pub const BATCH_MODIFY_MAX_IDS: usize = 1000;
