// src/pages.rs
use crate::session::{Flash, SessionIdentity};

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flash: Option<&Flash>, content: &str) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{} - Busca Ativa</title></head><body>", escape_html(title)));
    if let Some(flash) = flash {
        html.push_str(&format!(
            "<div class=\"flash flash-{}\">{}</div>",
            flash.level.as_str(),
            escape_html(&flash.message)
        ));
    }
    html.push_str(content);
    html.push_str("</body></html>");
    html
}

pub fn login_page(flash: Option<&Flash>) -> String {
    layout(
        "Login",
        flash,
        "<h1>Busca Ativa - Login do monitor</h1>\
         <form method=\"post\" action=\"/login\">\
         <label>Usuário <input name=\"usuario\" required></label>\
         <label>Senha <input name=\"senha\" type=\"password\" required></label>\
         <button type=\"submit\">Entrar</button>\
         </form>",
    )
}

pub fn registro_page(identity: &SessionIdentity, flash: Option<&Flash>) -> String {
    let content = format!(
        "<h1>Registrar falta</h1>\
         <p>Monitor: {} | Turno: {}</p>\
         <form method=\"post\" action=\"/registro\">\
         <label>Nome do aluno <input name=\"aluno_nome\" required></label>\
         <label>Data da falta <input name=\"data_falta\" type=\"date\" required></label>\
         <label>Motivo <textarea name=\"motivo\"></textarea></label>\
         <button type=\"submit\">Registrar</button>\
         </form>\
         <p><a href=\"/baixar\">Baixar arquivo do mês</a> | <a href=\"/logout\">Sair</a></p>",
        escape_html(&identity.full_name),
        escape_html(&identity.shift),
    );
    layout("Registro", flash, &content)
}

pub struct StatusView<'a> {
    pub server_time: String,
    pub ledger_name: &'a str,
    pub record_count: Option<usize>,
    pub smtp_configured: bool,
}

pub fn status_page(view: &StatusView<'_>) -> String {
    let records = match view.record_count {
        Some(count) => count.to_string(),
        None => "arquivo ainda não criado".to_string(),
    };
    let content = format!(
        "<h1>Status do servidor</h1>\
         <p>Hora do servidor: {}</p>\
         <p>Arquivo do mês: {}</p>\
         <p>Registros no mês: {}</p>\
         <p>Envio de email: {}</p>",
        escape_html(&view.server_time),
        escape_html(view.ledger_name),
        records,
        if view.smtp_configured {
            "configurado"
        } else {
            "não configurado"
        },
    );
    layout("Status", None, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FlashLevel;

    #[test]
    fn test_escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html("<script>alert('x')</script> & \"y\""),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt; &amp; &quot;y&quot;"
        );
    }

    #[test]
    fn test_registro_page_escapes_monitor_name() {
        let identity = SessionIdentity {
            username: "x".to_string(),
            full_name: "<b>Ana</b>".to_string(),
            shift: "Tarde".to_string(),
        };
        let html = registro_page(&identity, None);
        assert!(html.contains("&lt;b&gt;Ana&lt;/b&gt;"));
        assert!(!html.contains("<b>Ana</b>"));
    }

    #[test]
    fn test_flash_rendered_with_level_class() {
        let flash = Flash::new(FlashLevel::Warning, "Falta registrada");
        let html = login_page(Some(&flash));
        assert!(html.contains("<div class=\"flash flash-warning\">Falta registrada</div>"));
    }
}
