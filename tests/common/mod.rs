//! Static Scholar pages for integration tests.

#![allow(dead_code)]

use scholarleads::config::PipelineConfig;
use scholarleads::search::{build_search_url, SearchQuery};
use scholarleads::testing::StaticFetcher;

pub const BASE: &str = "https://scholar.google.com";
pub const MARIA_URL: &str = "https://scholar.google.com/citations?hl=pt-BR&user=MS0001";
pub const OTHER_URL: &str = "https://scholar.google.com/citations?hl=pt-BR&user=MS0002";
pub const COAUTHORS_URL: &str =
    "https://scholar.google.com/citations?view_op=list_colleagues&hl=pt-BR&user=MS0001";
pub const PUBLISHER_URL: &str = "https://doi.org/10.1590/example.2021";

pub const PUBLICATIONS_ON_PAGE: usize = 7;

pub fn search_url(name: &str) -> String {
    build_search_url(&PipelineConfig::default(), &SearchQuery::new(name))
        .map(|u| u.to_string())
        .unwrap_or_default()
}

pub fn detail_url(i: usize) -> String {
    format!("{BASE}/citations?view_op=view_citation&hl=pt-BR&citation_for_view=MS0001:{i}")
}

pub fn search_page() -> String {
    r#"<html><body>
         <div class="gsc_1usr">
           <a href="/citations?hl=pt-BR&amp;user=MS0001"><img src="a.jpg"></a>
           <h3 class="gs_ai_name"><a href="/citations?hl=pt-BR&amp;user=MS0001">Maria Silva</a></h3>
           <div class="gs_ai_eml">E-mail confirmado em ufrj.br</div>
         </div>
         <div class="gsc_1usr">
           <h3 class="gs_ai_name"><a href="/citations?hl=pt-BR&amp;user=MS0002">Maria da Silva</a></h3>
         </div>
       </body></html>"#
        .to_string()
}

pub fn profile_page() -> String {
    let rows: String = (0..PUBLICATIONS_ON_PAGE)
        .map(|i| {
            format!(
                r#"<tr class="gsc_a_tr"><td class="gsc_a_t">
                     <a href="/citations?view_op=view_citation&amp;hl=pt-BR&amp;citation_for_view=MS0001:{i}" class="gsc_a_at">Artigo {i}</a>
                     <div class="gs_gray">M Silva, A Souza</div>
                   </td></tr>"#
            )
        })
        .collect();

    format!(
        r#"<html><head><title>Maria Silva - Google Acadêmico</title></head><body>
             <div id="gsc_prf_in">Maria Silva</div>
             <div class="gsc_prf_il">Universidade Federal do Rio de Janeiro</div>
             <div id="gsc_prf_int">
               <a class="gsc_prf_inta">Pesquisa Qualitativa</a>
               <a class="gsc_prf_inta">Enfermagem</a>
             </div>
             <table id="gsc_rsb_st"><tbody>
               <tr><td class="gsc_rsb_sc1">Citações</td><td class="gsc_rsb_std">2.345</td><td class="gsc_rsb_std">1.100</td></tr>
               <tr><td class="gsc_rsb_sc1">Índice h</td><td class="gsc_rsb_std">21</td><td class="gsc_rsb_std">15</td></tr>
             </tbody></table>
             <div id="gsc_rsb_co">
               <h3 class="gsc_rsb_h"><a class="gsc_rsb_lbl" href="/citations?view_op=list_colleagues&amp;hl=pt-BR&amp;user=MS0001">Coautores</a></h3>
               <ul class="gsc_rsb_a">
                 <li><div class="gsc_rsb_aa"><div class="gsc_rsb_a_desc">
                   <a href="/citations?user=U1&amp;hl=pt-BR">Ana Souza</a>
                   <span class="gsc_rsb_a_ext">Universidade do Estado do Rio de Janeiro</span>
                   <span class="gsc_rsb_a_ext gsc_rsb_a_ext2">E-mail confirmado em uerj.br</span>
                 </div></div></li>
                 <li><div class="gsc_rsb_aa"><div class="gsc_rsb_a_desc">
                   <span>Bruno Lima</span>
                 </div></div></li>
               </ul>
             </div>
             <table id="gsc_a_t"><tbody id="gsc_a_b">{rows}</tbody></table>
           </body></html>"#
    )
}

pub fn all_coauthors_page() -> String {
    r#"<html><body>
         <div class="gsc_ucoar"><h3 class="gs_ai_name"><a href="/citations?user=U1&amp;hl=pt-BR">Ana Souza</a></h3></div>
         <div class="gsc_ucoar"><h3 class="gs_ai_name"><a href="/citations?user=U2&amp;hl=pt-BR">Carla Dias</a></h3></div>
       </body></html>"#
        .to_string()
}

pub const ABSTRACT_0: &str = "Estudo qualitativo com entrevistas semiestruturadas sobre o cuidado de enfermagem no turno da noite em hospitais públicos.";
pub const ABSTRACT_1: &str = "Etnografia de uma unidade básica de saúde, com observação participante ao longo de doze meses e análise temática das notas de campo.";
pub const ABSTRACT_2: &str = "Grupos focais com agentes comunitários de saúde revelaram barreiras de acesso e estratégias locais de cuidado na Amazônia.";
pub const ABSTRACT_3: &str = "Análise de conteúdo de prontuários e diários de campo para compreender a rotina de equipes de saúde da família.";

/// Detail page for publication `i`, each exercising a different strategy.
pub fn detail_page(i: usize) -> String {
    match i {
        0 => format!(
            r#"<html><body>
                 <div id="gsc_oci_title_wrapper">
                   <div class="gsc_oci_title_ggi"><a href="https://repositorio.ufrj.br/artigo0.pdf"><span>[PDF]</span> ufrj.br</a></div>
                   <div id="gsc_oci_title"><a class="gsc_oci_title_link" href="https://doi.org/10.1590/a0">Artigo 0</a></div>
                 </div>
                 <div class="gs_scl"><div class="gsc_oci_field">Descrição</div><div class="gsc_oci_value">{ABSTRACT_0}</div></div>
               </body></html>"#
        ),
        1 => format!(
            r#"<html><body>
                 <div class="gs_scl"><div class="gsc_oci_field">Autores</div><div class="gsc_oci_value">M Silva</div></div>
                 <div class="gsc_oci_value" id="gsc_oci_descr"><div class="gsh_csp">{ABSTRACT_1}</div></div>
               </body></html>"#
        ),
        2 => format!(
            r#"<html><body>
                 <div id="gsc_oci_title"><a class="gsc_oci_title_link" href="{PUBLISHER_URL}">Artigo 2</a></div>
                 <div class="gs_scl"><div class="gsc_oci_field">Autores</div><div class="gsc_oci_value">M Silva</div></div>
               </body></html>"#
        ),
        3 => format!(
            r#"<html><body>
                 <h3>Resumo</h3>
                 <p>{ABSTRACT_3}</p>
               </body></html>"#
        ),
        _ => r#"<html><body><div id="gsc_oci_title">Sem resumo</div></body></html>"#.to_string(),
    }
}

pub fn publisher_page() -> String {
    format!(
        r#"<html><body><div class="article"><section class="abstract"><p>{ABSTRACT_2}</p></section></div></body></html>"#
    )
}

/// A fetcher serving the whole "Maria Silva" scenario.
pub fn maria_silva_fetcher() -> StaticFetcher {
    (0..PUBLICATIONS_ON_PAGE).fold(
        StaticFetcher::new()
            .with_page(&search_url("Maria Silva"), search_page())
            .with_page(MARIA_URL, profile_page())
            .with_page(COAUTHORS_URL, all_coauthors_page())
            .with_page(PUBLISHER_URL, publisher_page()),
        |fetcher, i| fetcher.with_page(&detail_url(i), detail_page(i)),
    )
}
