pub mod serializers;

pub use serializers::{
    dap_resource, dap_resource_of, metadap_resource, user_resource, DapResource, MetaDapResource,
    UserResource,
};
