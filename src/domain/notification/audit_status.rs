//! Manuscript audit status codes.

/// Review state of a manuscript, as reported by the audit workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditStatus {
    /// 审核中
    Pending,
    /// 审核通过
    Approved,
    /// 审核未通过
    Rejected,
}

impl AuditStatus {
    pub fn code(&self) -> i8 {
        match self {
            AuditStatus::Pending => 1,
            AuditStatus::Approved => 2,
            AuditStatus::Rejected => 3,
        }
    }

    /// Maps a raw status code; unknown codes yield `None`.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(AuditStatus::Pending),
            2 => Some(AuditStatus::Approved),
            3 => Some(AuditStatus::Rejected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuditStatus::Pending => "审核中",
            AuditStatus::Approved => "审核通过",
            AuditStatus::Rejected => "审核未通过",
        }
    }

    /// User-facing text for a raw code, with a generic fallback.
    pub fn describe(code: i8) -> &'static str {
        Self::from_code(code)
            .map(|status| status.label())
            .unwrap_or("状态更新")
    }
}
