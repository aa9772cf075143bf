//! `#[derive(Entity)]` for SheetDb.
//!
//! ```ignore
//! #[derive(Entity)]
//! #[sheet(name = "Cars", header_row = 0)]
//! struct Car {
//!     #[sheet(key)]
//!     plate: String,
//!     #[sheet(column = "Factory")]
//!     factory: Option<Arc<CarFactory>>,
//!     #[sheet(default)]
//!     doors: i32,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, ExprPath, Fields, LitInt, LitStr, Token, parse_macro_input, spanned::Spanned,
};

#[proc_macro_derive(Entity, attributes(sheet))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/* ───────────────────────── parsed attributes ───────────────────────── */

#[derive(Default)]
struct SheetAttrs {
    name: Option<LitStr>,
    header_row: Option<LitInt>,
}

enum DefaultValue {
    Trait,
    Fn(ExprPath),
}

#[derive(Default)]
struct FieldAttrs {
    column: Option<LitStr>,
    key: bool,
    default: Option<DefaultValue>,
}

fn parse_sheet_attrs(input: &DeriveInput) -> syn::Result<SheetAttrs> {
    let mut out = SheetAttrs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("sheet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("header_row") {
                let lit: LitInt = meta.value()?.parse()?;
                lit.base10_parse::<u32>()?;
                out.header_row = Some(lit);
                Ok(())
            } else {
                Err(meta.error("expected `name` or `header_row`"))
            }
        })?;
    }
    Ok(out)
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("sheet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                out.column = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("key") {
                out.key = true;
                Ok(())
            } else if meta.path.is_ident("default") {
                out.default = Some(if meta.input.peek(Token![=]) {
                    let path: LitStr = meta.value()?.parse()?;
                    DefaultValue::Fn(path.parse()?)
                } else {
                    DefaultValue::Trait
                });
                Ok(())
            } else {
                Err(meta.error("expected `column`, `key` or `default`"))
            }
        })?;
    }
    Ok(out)
}

/* ───────────────────────────── expansion ───────────────────────────── */

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unnamed(_) | Fields::Unit => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new(
                input.ident.span(),
                "Entity can only be derived for structs",
            ));
        }
    };

    let sheet = parse_sheet_attrs(&input)?;
    let ident = &input.ident;
    let type_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let sheet_name = sheet.name.map(|n| quote!(.sheet_name(#n)));
    let header_row = sheet.header_row.map(|n| quote!(.header_row(#n)));

    let mut decls = Vec::new();
    let mut reads = Vec::new();
    let mut writes = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let attrs = parse_field_attrs(field)?;
        let Some(name) = field.ident.as_ref() else {
            return Err(syn::Error::new(field.span(), "expected a named field"));
        };
        let ty = &field.ty;
        let field_name = name.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);

        let column = attrs.column.as_ref().map(|c| quote!(.column(#c)));
        let key = attrs.key.then(|| quote!(.key()));
        let optional = attrs.default.as_ref().map(|_| quote!(.with_default()));
        decls.push(quote! {
            .field(::sheetdb::FieldDecl::of::<#ty>(#field_name) #column #key #optional)
        });

        reads.push(match &attrs.default {
            None => quote!(#name: row.required(#index)?),
            Some(DefaultValue::Trait) => {
                quote!(#name: row.or_default(#index, <#ty as ::core::default::Default>::default)?)
            }
            Some(DefaultValue::Fn(path)) => quote!(#name: row.or_default(#index, #path)?),
        });

        writes.push(quote! {
            #index => ::sheetdb::FieldType::write(&self.#name, out)
        });
    }

    Ok(quote! {
        impl #impl_generics ::sheetdb::Entity for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn describe() -> ::sheetdb::EntityDecl {
                ::sheetdb::EntityDecl::new(Self::TYPE_NAME)
                    #sheet_name
                    #header_row
                    #(#decls)*
            }

            fn decode(row: &mut ::sheetdb::RowReader<'_>) -> ::sheetdb::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#reads,)*
                })
            }

            fn encode_field(
                &self,
                index: usize,
                out: &mut ::sheetdb::FieldWriter<'_>,
            ) -> ::sheetdb::Result<::sheetdb::CellData> {
                match index {
                    #(#writes,)*
                    other => ::core::result::Result::Err(::sheetdb::Error::unknown_field(#type_name, other)),
                }
            }
        }
    })
}
