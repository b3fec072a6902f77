//! Derive macros for QAIL CQL codecs.
//!
//! Provides `#[derive(CqlEnum)]` and `#[derive(CqlUdt)]`, which generate the
//! per-variant and per-field codec wiring once, at compile time.
//!
//! ```ignore
//! use qail_cql::{CqlEnum, CqlUdt};
//!
//! #[derive(CqlEnum)]
//! #[cql(rename_all = "snake_case")]           // 'on_hold'
//! enum Status { Active, OnHold }
//!
//! #[derive(CqlEnum)]
//! #[cql(ordinal)]                             // 0, 1
//! enum Priority { Low, High }
//!
//! #[derive(CqlUdt)]
//! #[cql(name = "address", rename_all = "camelCase")]
//! struct Address {
//!     street_name: String,                    // streetName
//!     #[cql(rename = "zip")]
//!     postal_code: i32,                       // zip
//!     note: Option<String>,                   // may be absent from the schema
//! }
//! ```
//!
//! An explicit `rename` always wins over `rename_all`.

use proc_macro::TokenStream;
use proc_macro2::{Literal, Span, TokenStream as TokenStream2};
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr};

// ============================================================================
// Naming Schemes
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum RenameRule {
    Verbatim,
    Lower,
    Upper,
    Snake,
    ScreamingSnake,
    Camel,
    Pascal,
    Kebab,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "camelCase" => RenameRule::Camel,
            "PascalCase" => RenameRule::Pascal,
            "kebab-case" => RenameRule::Kebab,
            other => {
                return Err(syn::Error::new(
                    lit.span(),
                    format!(
                        "unknown rename_all rule '{}'; expected one of lowercase, UPPERCASE, \
                         snake_case, SCREAMING_SNAKE_CASE, camelCase, PascalCase, kebab-case",
                        other
                    ),
                ));
            }
        })
    }

    fn apply(self, name: &str) -> String {
        match self {
            RenameRule::Verbatim => name.to_string(),
            RenameRule::Lower => name.to_ascii_lowercase(),
            RenameRule::Upper => name.to_ascii_uppercase(),
            RenameRule::Snake => words(name).join("_"),
            RenameRule::ScreamingSnake => words(name).join("_").to_ascii_uppercase(),
            RenameRule::Kebab => words(name).join("-"),
            RenameRule::Pascal => words(name).iter().map(|w| capitalize(w)).collect(),
            RenameRule::Camel => {
                let words = words(name);
                let mut out = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        out.push_str(word);
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
        }
    }
}

/// Lowercase words of a snake_case or CamelCase identifier. `HTTPServer` splits
/// into `http`, `server`.
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
    rename_all: Option<RenameRule>,
    ordinal: bool,
}

fn container_attrs(attrs: &[Attribute], allow_ordinal: bool) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("cql")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                out.name = Some(lit.value());
            } else if meta.path.is_ident("rename_all") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename_all = Some(RenameRule::parse(&lit)?);
            } else if allow_ordinal && meta.path.is_ident("ordinal") {
                out.ordinal = true;
            } else {
                return Err(meta.error("unsupported cql attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// `#[cql(rename = "...")]` on a field or variant.
fn member_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("cql")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported cql attribute; expected `rename`"))
            }
        })?;
    }
    Ok(rename)
}

fn wire_name(ident: &Ident, attrs: &[Attribute], rule: RenameRule) -> syn::Result<String> {
    Ok(match member_rename(attrs)? {
        Some(name) => name,
        None => rule.apply(&ident.unraw().to_string()),
    })
}

fn reject_duplicates(names: &[String], idents: &[&Ident]) -> syn::Result<()> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(syn::Error::new(
                idents[i].span(),
                format!("duplicate CQL name '{}'", name),
            ));
        }
    }
    Ok(())
}

fn indices(count: usize) -> Vec<Literal> {
    (0..count).map(Literal::usize_unsuffixed).collect()
}

// ============================================================================
// CqlEnum
// ============================================================================

/// Derive `CqlEnum` and `CqlType` for a unit-only enum.
///
/// The default codec stores the variant name as `text`; `#[cql(ordinal)]`
/// stores the declaration index as `int` instead.
#[proc_macro_derive(CqlEnum, attributes(cql))]
pub fn derive_cql_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let data = match &input.data {
        Data::Enum(data) => data,
        _ => return Err(syn::Error::new(Span::call_site(), "CqlEnum can only be derived for enums")),
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(input.generics.span(), "CqlEnum does not support generics"));
    }
    if data.variants.is_empty() {
        return Err(syn::Error::new(ident.span(), "CqlEnum needs at least one variant"));
    }

    let attrs = container_attrs(&input.attrs, true)?;
    let rule = attrs.rename_all.unwrap_or(RenameRule::Verbatim);
    let type_name = attrs.name.unwrap_or_else(|| ident.to_string());

    let mut variants = Vec::new();
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.ident.span(),
                "CqlEnum variants cannot carry data",
            ));
        }
        names.push(wire_name(&variant.ident, &variant.attrs, rule)?);
        variants.push(&variant.ident);
    }
    reject_duplicates(&names, &variants)?;
    let idx = indices(variants.len());

    let codec = if attrs.ordinal {
        quote! {
            type Codec = ::qail_cql::codec::OrdinalCodec<Self>;

            fn codec() -> Self::Codec {
                ::qail_cql::codec::ordinal_codec::<Self>()
            }
        }
    } else {
        quote! {
            type Codec = ::qail_cql::codec::NominalCodec<Self>;

            fn codec() -> Self::Codec {
                ::qail_cql::codec::nominal_codec::<Self>()
            }
        }
    };

    Ok(quote! {
        impl ::qail_cql::codec::CqlEnum for #ident {
            const TYPE_NAME: &'static str = #type_name;
            const NAMES: &'static [&'static str] = &[#(#names),*];

            fn ordinal(&self) -> usize {
                match self {
                    #(Self::#variants => #idx,)*
                }
            }

            fn from_ordinal(ordinal: usize) -> ::core::option::Option<Self> {
                match ordinal {
                    #(#idx => ::core::option::Option::Some(Self::#variants),)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::qail_cql::codec::CqlType for #ident {
            #codec
        }
    })
}

// ============================================================================
// CqlUdt
// ============================================================================

/// Derive `UserType` and `CqlType` for a struct with named fields.
///
/// The UDT name defaults to the struct name in snake_case. Every field type must
/// implement `CqlType`; `Option<_>` fields may be missing from the live schema.
/// A derived UDT nested in another follows the nested type's live field order.
#[proc_macro_derive(CqlUdt, attributes(cql))]
pub fn derive_cql_udt(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_udt(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_udt(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    ident.span(),
                    "CqlUdt needs a struct with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new(Span::call_site(), "CqlUdt can only be derived for structs")),
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(input.generics.span(), "CqlUdt does not support generics"));
    }

    let attrs = container_attrs(&input.attrs, false)?;
    let rule = attrs.rename_all.unwrap_or(RenameRule::Verbatim);
    let udt_name = attrs
        .name
        .unwrap_or_else(|| RenameRule::Snake.apply(&ident.to_string()));

    let mut field_idents = Vec::new();
    let mut field_types = Vec::new();
    let mut columns = Vec::new();
    for field in fields {
        // Named fields always have an ident.
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        columns.push(wire_name(field_ident, &field.attrs, rule)?);
        field_idents.push(field_ident);
        field_types.push(&field.ty);
    }
    reject_duplicates(&columns, &field_idents)?;
    let idx = indices(field_idents.len());

    Ok(quote! {
        impl ::qail_cql::codec::UserType for #ident {
            const TYPE_NAME: &'static str = #udt_name;
            const FIELD_NAMES: &'static [&'static str] = &[#(#columns),*];

            fn field_types() -> ::std::vec::Vec<::qail_cql::types::WireType> {
                ::std::vec![#(::qail_cql::codec::udt::field_type::<#field_types>()),*]
            }

            fn field_nullability() -> ::std::vec::Vec<bool> {
                ::std::vec![#(<#field_types as ::qail_cql::codec::CqlType>::NULLABLE),*]
            }

            fn field_codec(
                index: usize,
                wire_type: &::qail_cql::types::WireType,
            ) -> ::qail_cql::error::CqlResult<::qail_cql::codec::udt::ErasedFieldCodec> {
                match index {
                    #(#idx => ::qail_cql::codec::udt::field_codec::<#field_types>(wire_type),)*
                    _ => ::core::result::Result::Err(
                        ::qail_cql::codec::udt::field_out_of_range::<Self>(index),
                    ),
                }
            }

            fn encode_field(
                &self,
                index: usize,
                codecs: &::qail_cql::codec::FieldCodecs,
            ) -> ::qail_cql::error::CqlResult<::core::option::Option<::std::vec::Vec<u8>>> {
                match index {
                    #(#idx => ::qail_cql::codec::udt::encode_field(codecs, #idx, &self.#field_idents),)*
                    _ => ::core::result::Result::Err(
                        ::qail_cql::codec::udt::field_out_of_range::<Self>(index),
                    ),
                }
            }

            fn format_field(
                &self,
                index: usize,
                codecs: &::qail_cql::codec::FieldCodecs,
            ) -> ::std::string::String {
                match index {
                    #(#idx => ::qail_cql::codec::udt::format_field(codecs, #idx, &self.#field_idents),)*
                    _ => ::std::string::String::from(::qail_cql::parser::NULL_TOKEN),
                }
            }

            fn decode_fields(
                fields: &::qail_cql::codec::FieldValues<'_>,
            ) -> ::qail_cql::error::CqlResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#field_idents: ::qail_cql::codec::udt::decode_field(fields, #idx)?,)*
                })
            }

            fn parse_fields(
                fields: &::qail_cql::codec::FieldLiterals<'_>,
            ) -> ::qail_cql::error::CqlResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#field_idents: ::qail_cql::codec::udt::parse_field(fields, #idx)?,)*
                })
            }
        }

        impl ::qail_cql::codec::CqlType for #ident {
            type Codec = ::qail_cql::codec::UdtCodec<Self>;

            fn codec() -> Self::Codec {
                ::qail_cql::codec::UdtCodec::declared()
            }

            fn codec_for(
                wire_type: &::qail_cql::types::WireType,
            ) -> ::qail_cql::error::CqlResult<Self::Codec> {
                ::qail_cql::codec::udt::udt_codec_for::<Self>(wire_type)
            }
        }
    })
}
