//! Custom Resource Definitions for autobucket

mod bucket;

pub use bucket::{
    Bucket, BucketCloud, BucketOnDeletePolicy, BucketSpec, BucketStatus, ParseEnumError,
};
