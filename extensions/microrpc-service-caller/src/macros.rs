/// Generates a client-side service descriptor: a struct with one
/// [`MethodStub`](crate::MethodStub) field per remote method, plus a
/// [`BindService`](crate::BindService) impl that fills every field from one
/// caller.
///
/// ```ignore
/// rpc_service_stub! {
///     /// Client handle for `UserService`.
///     pub struct UserServiceClient {
///         get_by_id: GetById,
///         rename: Rename,
///     }
/// }
///
/// let users = UserServiceClient::bind(&client);
/// let user = users.get_by_id.call(&CallOptions::new(), &GetByIdRequest { id: 123 }).await?;
/// ```
#[macro_export]
macro_rules! rpc_service_stub {
    (
        $(#[$struct_meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $method:ty
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        $vis struct $name<C: $crate::RpcServiceCallerInterface + ?Sized> {
            $(
                $(#[$field_meta])*
                pub $field: $crate::MethodStub<$method, C>,
            )*
        }

        impl<C: $crate::RpcServiceCallerInterface + ?Sized> $crate::BindService<C> for $name<C> {
            fn bind(caller: &::std::sync::Arc<C>) -> Self {
                Self {
                    $(
                        $field: $crate::MethodStub::new(::std::sync::Arc::clone(caller)),
                    )*
                }
            }
        }

        impl<C: $crate::RpcServiceCallerInterface + ?Sized> ::std::clone::Clone for $name<C> {
            fn clone(&self) -> Self {
                Self {
                    $(
                        $field: ::std::clone::Clone::clone(&self.$field),
                    )*
                }
            }
        }
    };
}
