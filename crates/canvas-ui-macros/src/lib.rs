//! Proc-macros for canvas-ui.
//!
//! Currently provided:
//! - `#[derive(Settings)]`: generates `with_<field>(...)` builder-style methods
//!   for each named field of a configuration struct, plus a `sanitize()` method
//!   that clamps every field declared with a range.
//!
//! ## Field control
//! - `#[settings(skip)]`: no builder is generated for the field.
//! - `#[settings(range(min = <expr>, max = <expr>))]`: the builder clamps the
//!   incoming value and `sanitize()` clamps the stored one.
//!
//! ### Example
//! ```ignore
//! use canvas_ui_macros::Settings;
//!
//! #[derive(Clone, Debug, Settings)]
//! pub struct NavigationPreferences {
//!     #[settings(range(min = 0.01, max = 10.0))]
//!     pub orbit_sensitivity: f32,
//!     pub zoom_to_cursor: bool,
//! }
//!
//! let prefs = NavigationPreferences::default().with_orbit_sensitivity(50.0);
//! assert_eq!(prefs.orbit_sensitivity, 10.0);
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Expr, Fields};

/// Parsed `#[settings(...)]` options for one field.
#[derive(Default)]
struct FieldOptions {
    skip: bool,
    range: Option<(Expr, Expr)>,
}

/// Derive that generates `with_<field>` builders and a clamping `sanitize()`.
#[proc_macro_derive(Settings, attributes(settings))]
pub fn derive_settings(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let ident = &input.ident;
    let generics = &input.generics;

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new(input.span(), "#[derive(Settings)] only supports structs")
            .to_compile_error()
            .into();
    };

    let Fields::Named(fields_named) = &data_struct.fields else {
        return syn::Error::new(
            data_struct.fields.span(),
            "#[derive(Settings)] only supports structs with named fields",
        )
        .to_compile_error()
        .into();
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut builders = Vec::with_capacity(fields_named.named.len());
    let mut clamps = Vec::new();

    for field in fields_named.named.iter() {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };

        let options = match parse_field_options(field) {
            Ok(options) => options,
            Err(err) => return err.to_compile_error().into(),
        };

        let field_ty = &field.ty;

        if let Some((min, max)) = &options.range {
            clamps.push(quote! {
                self.#field_ident = self.#field_ident.clamp(#min, #max);
            });
        }

        if options.skip {
            continue;
        }

        let method_ident = format_ident!("with_{}", field_ident);
        let body = match &options.range {
            Some((min, max)) => quote! { self.#field_ident = value.clamp(#min, #max); },
            None => quote! { self.#field_ident = value; },
        };

        builders.push(quote! {
            #[inline]
            pub fn #method_ident(mut self, value: #field_ty) -> Self {
                #body
                self
            }
        });
    }

    quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#builders)*

            /// Clamp every ranged field into its declared bounds.
            pub fn sanitize(&mut self) {
                #(#clamps)*
            }

            /// Consuming variant of [`Self::sanitize`].
            pub fn sanitized(mut self) -> Self {
                self.sanitize();
                self
            }
        }
    }
    .into()
}

fn parse_field_options(field: &syn::Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("settings") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("range") {
                let mut min = None;
                let mut max = None;
                meta.parse_nested_meta(|bound| {
                    if bound.path.is_ident("min") {
                        min = Some(bound.value()?.parse::<Expr>()?);
                        Ok(())
                    } else if bound.path.is_ident("max") {
                        max = Some(bound.value()?.parse::<Expr>()?);
                        Ok(())
                    } else {
                        Err(bound.error("expected `min` or `max`"))
                    }
                })?;

                return match (min, max) {
                    (Some(min), Some(max)) => {
                        options.range = Some((min, max));
                        Ok(())
                    }
                    _ => Err(meta.error("range needs both `min` and `max`")),
                };
            }

            Err(meta.error("unsupported settings option"))
        })?;
    }

    Ok(options)
}
