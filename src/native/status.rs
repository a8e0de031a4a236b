/// Status codes reported by the native scrypt library.
///
/// The known codes form a closed set; anything else is kept verbatim in
/// [`NativeStatus::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Success,
    MemoryLimitQuery,
    ClockQuery,
    DerivedKey,
    SaltRead,
    OpenSsl,
    MallocFailed,
    InvalidBlock,
    UnrecognizedFormat,
    TooMuchMemory,
    TooMuchTime,
    IncorrectPassword,
    OutputWrite,
    InputRead,
    Unrecognized(i32),
}

impl NativeStatus {
    /// Returns `None` for `0`, the success sentinel.
    pub fn from_code(code: i32) -> Option<Self> {
        match Self::from_raw(code) {
            Self::Success => None,
            status => Some(status),
        }
    }

    /// Converts a raw status into a `Result`, treating `0` as success.
    pub fn check(code: i32) -> Result<(), Self> {
        Self::from_code(code).map_or(Ok(()), Err)
    }

    fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::MemoryLimitQuery,
            2 => Self::ClockQuery,
            3 => Self::DerivedKey,
            4 => Self::SaltRead,
            5 => Self::OpenSsl,
            6 => Self::MallocFailed,
            7 => Self::InvalidBlock,
            8 => Self::UnrecognizedFormat,
            9 => Self::TooMuchMemory,
            10 => Self::TooMuchTime,
            11 => Self::IncorrectPassword,
            12 => Self::OutputWrite,
            13 => Self::InputRead,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::MemoryLimitQuery => 1,
            Self::ClockQuery => 2,
            Self::DerivedKey => 3,
            Self::SaltRead => 4,
            Self::OpenSsl => 5,
            Self::MallocFailed => 6,
            Self::InvalidBlock => 7,
            Self::UnrecognizedFormat => 8,
            Self::TooMuchMemory => 9,
            Self::TooMuchTime => 10,
            Self::IncorrectPassword => 11,
            Self::OutputWrite => 12,
            Self::InputRead => 13,
            Self::Unrecognized(code) => code,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::MemoryLimitQuery => "getrlimit or sysctl(hw.usermem) failed",
            Self::ClockQuery => "clock_getres or clock_gettime failed",
            Self::DerivedKey => "error computing derived key",
            Self::SaltRead => "could not read salt from /dev/urandom",
            Self::OpenSsl => "error in OpenSSL",
            Self::MallocFailed => "malloc failed",
            Self::InvalidBlock => "data is not a valid scrypt-encrypted block",
            Self::UnrecognizedFormat => "unrecognized scrypt format",
            Self::TooMuchMemory => "decrypting file would take too much memory",
            Self::TooMuchTime => "decrypting file would take too long",
            Self::IncorrectPassword => "password is incorrect",
            Self::OutputWrite => "error writing output file",
            Self::InputRead => "error reading input file",
            Self::Unrecognized(_) => "error unknown",
        }
    }
}
