pub mod pipeline;

/// Identifies one question being processed, for logging.
pub struct ExtractCtx {
    pub exam_id: String,
    pub question_id: u32,
}

impl ExtractCtx {
    pub fn log_prefix(&self) -> String {
        format!("[{} Q#{}]", self.exam_id, self.question_id)
    }
}
