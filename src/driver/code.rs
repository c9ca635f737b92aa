//! Driver return codes
//!
//! Success/failure classification reported by a driver for every request,
//! modelled on libmemcached's `memcached_return`.

use std::fmt;

/// Result classification for a driver request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReturnCode {
    Success = 0,
    Failure = 1,
    HostLookupFailure = 2,
    ConnectionFailure = 3,
    WriteFailure = 5,
    ReadFailure = 6,
    UnknownReadFailure = 7,
    ProtocolError = 8,
    ClientError = 9,
    ServerError = 10,
    DataExists = 12,
    NotStored = 14,
    Stored = 15,
    NotFound = 16,
    SomeErrors = 19,
    NoServers = 20,
    End = 21,
    Timeout = 31,
    BadKeyProvided = 33,
    ServerMarkedDead = 35,
    TooBig = 37,
    InvalidArguments = 38,
}

impl ReturnCode {
    /// True for codes that mean the request did what was asked
    pub fn is_success(self) -> bool {
        matches!(self, ReturnCode::Success | ReturnCode::Stored | ReturnCode::End)
    }

    /// Human-readable message, as libmemcached's strerror reports it
    pub fn message(self) -> &'static str {
        match self {
            ReturnCode::Success => "SUCCESS",
            ReturnCode::Failure => "FAILURE",
            ReturnCode::HostLookupFailure => "getaddrinfo() or getnameinfo() HOSTNAME LOOKUP FAILURE",
            ReturnCode::ConnectionFailure => "CONNECTION FAILURE",
            ReturnCode::WriteFailure => "WRITE FAILURE",
            ReturnCode::ReadFailure => "READ FAILURE",
            ReturnCode::UnknownReadFailure => "UNKNOWN READ FAILURE",
            ReturnCode::ProtocolError => "PROTOCOL ERROR",
            ReturnCode::ClientError => "CLIENT ERROR",
            ReturnCode::ServerError => "SERVER ERROR",
            ReturnCode::DataExists => "CONNECTION DATA EXISTS",
            ReturnCode::NotStored => "NOT STORED",
            ReturnCode::Stored => "STORED",
            ReturnCode::NotFound => "NOT FOUND",
            ReturnCode::NoServers => "NO SERVERS DEFINED",
            ReturnCode::End => "SERVER END",
            ReturnCode::SomeErrors => "SOME ERRORS WERE REPORTED",
            ReturnCode::BadKeyProvided => "A BAD KEY WAS PROVIDED/CHARACTERS OUT OF RANGE",
            ReturnCode::Timeout => "A TIMEOUT OCCURRED",
            ReturnCode::TooBig => "ITEM TOO BIG",
            ReturnCode::InvalidArguments => "INVALID ARGUMENTS",
            ReturnCode::ServerMarkedDead => "SERVER IS MARKED DEAD",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
