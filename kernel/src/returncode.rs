//! `ReturnCode`: the small C-ABI-friendly result type HIL traits use for
//! operations that start asynchronously and complete via a callback (flash
//! program/erase/read). VM-internal code uses `error::KernelError` instead,
//! since it never crosses an ABI boundary and wants a richer enum.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    SuccessWithValue { value: usize },
    SUCCESS,
    FAIL,
    EBUSY,
    EALREADY,
    EOFF,
    ERESERVE,
    EINVAL,
    ESIZE,
    ECANCEL,
    ENOMEM,
    ENOSUPPORT,
    ENODEVICE,
    EUNINSTALLED,
    ENOACK,
}

impl From<ReturnCode> for isize {
    fn from(original: ReturnCode) -> isize {
        match original {
            ReturnCode::SuccessWithValue { value } => value as isize,
            ReturnCode::SUCCESS => 0,
            ReturnCode::FAIL => -1,
            ReturnCode::EBUSY => -2,
            ReturnCode::EALREADY => -3,
            ReturnCode::EOFF => -4,
            ReturnCode::ERESERVE => -5,
            ReturnCode::EINVAL => -6,
            ReturnCode::ESIZE => -7,
            ReturnCode::ECANCEL => -8,
            ReturnCode::ENOMEM => -9,
            ReturnCode::ENOSUPPORT => -10,
            ReturnCode::ENODEVICE => -11,
            ReturnCode::EUNINSTALLED => -12,
            ReturnCode::ENOACK => -13,
        }
    }
}

impl ReturnCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ReturnCode::SUCCESS | ReturnCode::SuccessWithValue { .. })
    }
}
