/*!
Procedural macros for JSON Schema reflection.

This crate provides `#[derive(Reflect)]`, which describes a type's shape,
field annotations and documentation for `elif-jsonschema`.
*/

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Fields, GenericParam, Lit,
    LitStr, Meta, Visibility,
};

/// Derive macro implementing `elif_jsonschema::Reflect`
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    generate_reflect_impl(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// `#[reflect(...)]` options on the type itself
#[derive(Default)]
struct ContainerOptions {
    name: Option<String>,
    anchor: Option<String>,
    custom: bool,
    integer_enum: bool,
}

/// `#[reflect(...)]` options on a field
#[derive(Default)]
struct FieldOptions {
    json: Option<String>,
    yaml: Option<String>,
    schema: Option<String>,
    extras: Option<String>,
    description: Option<String>,
    embed: bool,
}

fn parse_container_options(attrs: &[Attribute]) -> Result<ContainerOptions, syn::Error> {
    let mut options = ContainerOptions::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("anchor") {
                options.anchor = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("custom") {
                options.custom = true;
            } else if meta.path.is_ident("integer_enum") {
                options.integer_enum = true;
            } else {
                return Err(meta.error("unknown reflect option, expected `name`, `anchor`, `custom` or `integer_enum`"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

fn parse_field_options(attrs: &[Attribute]) -> Result<FieldOptions, syn::Error> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("json") {
                &mut options.json
            } else if meta.path.is_ident("yaml") {
                &mut options.yaml
            } else if meta.path.is_ident("schema") {
                &mut options.schema
            } else if meta.path.is_ident("extras") {
                &mut options.extras
            } else if meta.path.is_ident("description") {
                &mut options.description
            } else if meta.path.is_ident("embed") {
                options.embed = true;
                return Ok(());
            } else {
                return Err(meta.error("unknown reflect field option"));
            };
            *slot = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        })?;
    }
    Ok(options)
}

/// Joined `///` comments, if any
fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect();

    let doc = lines.join("\n").trim().to_string();
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

fn optional_call(method: TokenStream2, value: &Option<String>) -> TokenStream2 {
    match value {
        Some(value) => quote! { .#method(#value) },
        None => quote! {},
    }
}

/// Generate implementation for the Reflect trait
fn generate_reflect_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let options = parse_container_options(&input.attrs)?;
    let ident = &input.ident;
    let type_name = options.name.clone().unwrap_or_else(|| ident.to_string());

    let mut generics = input.generics.clone();
    for param in generics.params.iter_mut() {
        match param {
            GenericParam::Type(param) => param
                .bounds
                .push(syn::parse_quote!(::elif_jsonschema::Reflect)),
            GenericParam::Lifetime(lifetime) => {
                return Err(syn::Error::new_spanned(
                    lifetime,
                    "Reflect cannot be derived for types with lifetime parameters",
                ));
            }
            GenericParam::Const(_) => {}
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let kind_def = match &input.data {
        Data::Struct(data) => struct_type_def(&type_name, &data.fields, &options, input)?,
        Data::Enum(data) => {
            if options.custom {
                quote! {
                    ::elif_jsonschema::TypeDef::named(#type_name, ::core::module_path!(), ::elif_jsonschema::TypeKind::Any)
                }
            } else if !options.integer_enum {
                return Err(syn::Error::new_spanned(
                    input,
                    "Reflect on enums requires #[reflect(integer_enum)] or #[reflect(custom)]",
                ));
            } else if let Some(variant) = data.variants.iter().find(|v| !matches!(v.fields, Fields::Unit)) {
                return Err(syn::Error::new_spanned(
                    variant,
                    "integer enums cannot carry data",
                ));
            } else {
                quote! {
                    ::elif_jsonschema::TypeDef::named(#type_name, ::core::module_path!(), ::elif_jsonschema::TypeKind::IntegerEnum)
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Reflect cannot be derived for union types",
            ));
        }
    };

    let description = optional_call(quote!(with_description), &doc_comment(&input.attrs));
    let anchor = optional_call(quote!(with_anchor), &options.anchor);
    let custom = if options.custom {
        quote! { .with_custom_schema(<Self as ::elif_jsonschema::SchemaOverride>::json_schema) }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::elif_jsonschema::Reflect for #ident #ty_generics #where_clause {
            fn type_def() -> ::elif_jsonschema::TypeDef {
                #kind_def
                    #description
                    #anchor
                    #custom
            }
        }
    })
}

/// Descriptor expression for struct types
fn struct_type_def(
    type_name: &str,
    fields: &Fields,
    options: &ContainerOptions,
    input: &DeriveInput,
) -> Result<TokenStream2, syn::Error> {
    match fields {
        Fields::Named(named) => {
            let fields = named
                .named
                .iter()
                .map(field_expr)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(quote! {
                ::elif_jsonschema::TypeDef::record(#type_name, ::core::module_path!(), vec![#(#fields),*])
            })
        }
        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            // Newtypes are transparent over their single field
            let inner = &unnamed.unnamed[0].ty;
            Ok(quote! {
                ::elif_jsonschema::TypeDef::named(
                    #type_name,
                    ::core::module_path!(),
                    ::elif_jsonschema::TypeKind::Transparent(::elif_jsonschema::TypeRef::of::<#inner>()),
                )
            })
        }
        _ if options.custom => Ok(quote! {
            ::elif_jsonschema::TypeDef::named(#type_name, ::core::module_path!(), ::elif_jsonschema::TypeKind::Any)
        }),
        Fields::Unnamed(_) => Err(syn::Error::new_spanned(
            input,
            "Reflect supports tuple structs with exactly one field",
        )),
        Fields::Unit => Err(syn::Error::new_spanned(
            input,
            "Reflect cannot be derived for unit structs without #[reflect(custom)]",
        )),
    }
}

/// `Field` builder expression for one named field
fn field_expr(field: &syn::Field) -> Result<TokenStream2, syn::Error> {
    let options = parse_field_options(&field.attrs)?;
    let ident = field
        .ident
        .as_ref()
        .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let ty = &field.ty;

    let private = if matches!(field.vis, Visibility::Public(_)) {
        quote! {}
    } else {
        quote! { .private() }
    };
    let embedded = if options.embed {
        quote! { .embedded() }
    } else {
        quote! {}
    };
    let json = optional_call(quote!(json), &options.json);
    let yaml = optional_call(quote!(yaml), &options.yaml);
    let schema = optional_call(quote!(schema), &options.schema);
    let extras = optional_call(quote!(extras), &options.extras);
    let description = optional_call(quote!(description), &options.description);
    let doc = optional_call(quote!(doc), &doc_comment(&field.attrs));

    Ok(quote! {
        ::elif_jsonschema::Field::new(#ident, ::elif_jsonschema::TypeRef::of::<#ty>())
            #private #embedded #json #yaml #schema #extras #description #doc
    })
}
