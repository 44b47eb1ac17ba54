pub(crate) mod init;
pub(crate) mod setup;
pub(crate) mod status;
pub(crate) mod unseal;
