use ari_core::dates::{parse_date, parse_datetime};
use ari_core::*;
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ari")]
#[command(about = "Lembrete de medicamentos para pacientes e responsáveis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory (where the session token is kept)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        senha: String,
    },

    /// Create an account
    Cadastro {
        #[arg(long)]
        nome: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        senha: String,
        /// Birth date (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        data: NaiveDate,
    },

    /// End the session
    Logout,

    /// Patient overview: user, medicines and next doses (default)
    Home,

    /// Manage medicines
    Remedio {
        #[command(subcommand)]
        action: RemedioAction,
    },

    /// Manage prescriptions
    Prescricao {
        #[command(subcommand)]
        action: PrescricaoAction,
    },

    /// Show the dose history of a prescription
    Historico {
        prescricao_id: i64,

        /// Also export the history as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Manage caregivers
    Responsavel {
        #[command(subcommand)]
        action: ResponsavelAction,
    },

    /// Live countdown to the next doses
    Lembrete {
        /// Print the countdown once and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Subcommand)]
enum RemedioAction {
    List,
    Add {
        #[arg(long)]
        nome: String,
        #[arg(long, default_value = "")]
        funcao: String,
        #[arg(long, default_value = "")]
        dosagem: String,
    },
    Edit {
        id: i64,
        #[arg(long)]
        nome: Option<String>,
        #[arg(long)]
        funcao: Option<String>,
        #[arg(long)]
        dosagem: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum PrescricaoAction {
    List,
    Add {
        /// Patient id
        #[arg(long)]
        usuario: i64,
        /// Medicine id
        #[arg(long)]
        remedio: i64,
        /// Hours between doses
        #[arg(long, default_value_t = 1)]
        frequencia: u32,
        #[arg(long, default_value = "")]
        observacao: String,
        #[arg(long, value_parser = datetime_arg)]
        inicio: Option<DateTime<Utc>>,
        #[arg(long, value_parser = date_arg)]
        fim: Option<NaiveDate>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        observacao: Option<String>,
        #[arg(long)]
        frequencia: Option<u32>,
        #[arg(long, value_parser = datetime_arg)]
        inicio: Option<DateTime<Utc>>,
        #[arg(long, value_parser = date_arg)]
        fim: Option<NaiveDate>,
    },
    Delete {
        id: i64,
    },
    /// Mark the current dose as taken now
    Tomar {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ResponsavelAction {
    List,
    Add { id: i64 },
    Remove { id: i64 },
}

fn date_arg(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("data inválida: {raw} (use AAAA-MM-DD)"))
}

fn datetime_arg(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_datetime(raw).ok_or_else(|| format!("data/hora inválida: {raw}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        ari_core::logging::init_with_level("debug");
    } else {
        ari_core::logging::init();
    }

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    config.validate()?;
    tracing::debug!(
        "Backend {} (session in {:?})",
        config.api.base_url,
        config.data.session_path()
    );

    let ctx = AppContext::from_config(config)?;

    let result = match cli.command.unwrap_or(Commands::Home) {
        Commands::Login { email, senha } => cmd_login(&ctx, email, senha),
        Commands::Cadastro {
            nome,
            email,
            senha,
            data,
        } => cmd_cadastro(&ctx, nome, email, senha, data),
        Commands::Logout => cmd_logout(&ctx),
        Commands::Home => cmd_home(&ctx),
        Commands::Remedio { action } => cmd_remedio(&ctx, action),
        Commands::Prescricao { action } => cmd_prescricao(&ctx, action),
        Commands::Historico { prescricao_id, csv } => cmd_historico(&ctx, prescricao_id, csv),
        Commands::Responsavel { action } => cmd_responsavel(&ctx, action),
        Commands::Lembrete { once } => cmd_lembrete(&ctx, once),
    };

    report(&ctx, &result);
    result
}

/// Print pending alerts and, after an auth failure, how to get back in
fn report(ctx: &AppContext, result: &Result<()>) {
    for alert in ctx.navigator.take_alerts() {
        eprintln!("⚠ {}", alert);
    }
    if let Err(e) = result {
        if e.is_auth() {
            eprintln!("Faça login novamente com `ari login`.");
        }
    }
}

/// Enter an authenticated route, failing if the session is missing or was just rejected
fn enter(ctx: &AppContext, route: Route) -> Result<()> {
    if !ctx.enter(route) {
        return Err(Error::NotAuthenticated);
    }
    Ok(())
}

fn cmd_login(ctx: &AppContext, email: String, senha: String) -> Result<()> {
    ctx.login(&Credentials { email, senha })?;
    println!("✓ Login realizado.");
    cmd_home(ctx)
}

fn cmd_cadastro(
    ctx: &AppContext,
    nome: String,
    email: String,
    senha: String,
    data: NaiveDate,
) -> Result<()> {
    ari_core::auth::signup(
        &ctx.api,
        &NovoUsuario {
            nome,
            email,
            senha,
            data,
        },
    )?;
    println!("✓ Cadastro realizado. Faça login com `ari login`.");
    Ok(())
}

fn cmd_logout(ctx: &AppContext) -> Result<()> {
    ctx.logout()?;
    println!("✓ Sessão encerrada.");
    Ok(())
}

fn cmd_home(ctx: &AppContext) -> Result<()> {
    enter(ctx, Route::Home)?;
    let dashboard = Dashboard::load(
        &ctx.api,
        &ctx.usuario,
        &ctx.prescricoes,
        &ctx.config.countdown.due_message,
    );

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  INFORMAÇÕES DO PACIENTE");
    println!("╰─────────────────────────────────────────╯");
    println!("  Nome:   {}", dashboard.usuario.nome);
    println!("  Email:  {}", dashboard.usuario.email);
    println!(
        "  Status: {}",
        if dashboard.usuario.status { "Ativo" } else { "Inativo" }
    );

    println!("\nMedicamentos");
    if dashboard.remedios.is_empty() {
        println!("  Nenhum remédio encontrado.");
    }
    for remedio in &dashboard.remedios {
        print_remedio(remedio);
    }

    println!("\nPrescrições");
    if dashboard.prescricoes.is_empty() {
        println!("  Nenhuma prescrição encontrada.");
    }
    for (prescricao, dose) in dashboard.prescricoes.iter().zip(&dashboard.doses) {
        print_prescricao(prescricao);
        println!("    Próxima dose: {}", dose.text);
    }
    println!();
    Ok(())
}

fn cmd_remedio(ctx: &AppContext, action: RemedioAction) -> Result<()> {
    enter(ctx, Route::Remedio)?;
    let mut screen = RemedioScreen::new();

    match action {
        RemedioAction::List => {
            screen.refresh(&ctx.api)?;
        }
        RemedioAction::Add {
            nome,
            funcao,
            dosagem,
        } => {
            screen.draft = NovoRemedio {
                nome,
                funcao,
                dosagem,
            };
            screen.submit_new(&ctx.api)?;
            println!("✓ Remédio adicionado.");
        }
        RemedioAction::Edit {
            id,
            nome,
            funcao,
            dosagem,
        } => {
            screen.refresh(&ctx.api)?;
            screen.begin_edit(id)?;
            if let Some(remedio) = screen.editing_mut() {
                if let Some(nome) = nome {
                    remedio.nome = nome;
                }
                if let Some(funcao) = funcao {
                    remedio.funcao = funcao;
                }
                if let Some(dosagem) = dosagem {
                    remedio.dosagem = dosagem;
                }
            }
            screen.save_edit(&ctx.api)?;
            println!("✓ Remédio {} atualizado.", id);
        }
        RemedioAction::Delete { id } => {
            screen.delete(&ctx.api, id)?;
            println!("✓ Remédio {} removido.", id);
        }
    }

    println!("\nLista de Remédios");
    if let Some(empty) = screen.empty_message() {
        println!("  {}", empty);
    }
    for remedio in screen.items() {
        print_remedio(remedio);
    }
    Ok(())
}

fn cmd_prescricao(ctx: &AppContext, action: PrescricaoAction) -> Result<()> {
    enter(ctx, Route::Prescricao)?;

    let mut screen = PrescricaoScreen::new();
    match action {
        PrescricaoAction::List => {
            screen.refresh(&ctx.api)?;
        }
        PrescricaoAction::Add {
            usuario,
            remedio,
            frequencia,
            observacao,
            inicio,
            fim,
        } => {
            screen.draft = NovaPrescricao {
                id_usuario: usuario,
                id_remedio: remedio,
                observacao,
                frequencia,
                data_inicio: inicio,
                data_fim: fim,
            };
            screen.submit_new(&ctx.api)?;
            println!("✓ Prescrição adicionada.");
        }
        PrescricaoAction::Edit {
            id,
            observacao,
            frequencia,
            inicio,
            fim,
        } => {
            screen.refresh(&ctx.api)?;
            screen.begin_edit(id)?;
            if let Some(prescricao) = screen.editing_mut() {
                if let Some(observacao) = observacao {
                    prescricao.observacao = Some(observacao);
                }
                if let Some(frequencia) = frequencia {
                    prescricao.frequencia = frequencia;
                }
                if let Some(inicio) = inicio {
                    prescricao.data_inicio = inicio;
                }
                if fim.is_some() {
                    prescricao.data_fim = fim;
                }
            }
            screen.save_edit(&ctx.api)?;
            println!("✓ Prescrição {} atualizada.", id);
        }
        PrescricaoAction::Delete { id } => {
            screen.delete(&ctx.api, id)?;
            println!("✓ Prescrição {} removida.", id);
        }
        PrescricaoAction::Tomar { id } => return cmd_tomar(ctx, id),
    }

    println!("\nLista de Prescrições");
    if let Some(empty) = screen.empty_message() {
        println!("  {}", empty);
    }
    for prescricao in screen.items() {
        print_prescricao(prescricao);
    }
    Ok(())
}

fn cmd_tomar(ctx: &AppContext, id: i64) -> Result<()> {
    let taken_at = Utc::now();
    ctx.prescricoes.take_dose(&ctx.api, id, taken_at)?;
    println!(
        "✓ Dose registrada às {}.",
        taken_at.with_timezone(&Local).format("%H:%M:%S")
    );
    if let Some(line) = ctx
        .countdown_view()
        .snapshot(Utc::now())
        .into_iter()
        .find(|l| l.prescricao_id == id)
    {
        println!("  Próxima dose em {}", line.text);
    }
    Ok(())
}

fn cmd_historico(ctx: &AppContext, prescricao_id: i64, csv: Option<PathBuf>) -> Result<()> {
    enter(ctx, Route::Historico)?;
    let mut view = HistoryView::new();
    view.open(&ctx.api, prescricao_id)?;

    println!("\nHistórico da prescrição {}", prescricao_id);
    if view.entries().is_empty() {
        println!("  {}", HistoryView::EMPTY_MESSAGE);
    }
    for entry in view.entries() {
        println!(
            "  • {}  {} ({}) {}",
            entry.tomado_em.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
            entry.nome,
            entry.dosagem,
            frequencia_label(entry.frequencia)
        );
    }

    if let Some(path) = csv {
        let count = view.export_csv(&path)?;
        println!("\n✓ {} registros exportados para {}", count, path.display());
    }
    Ok(())
}

fn cmd_responsavel(ctx: &AppContext, action: ResponsavelAction) -> Result<()> {
    enter(ctx, Route::Responsavel)?;
    let paciente_id = match ctx.usuario.get().id {
        0 => ctx.api.session()?.user_id,
        id => id,
    };

    let mut screen = ResponsavelScreen::new();
    match action {
        ResponsavelAction::List => screen.refresh(&ctx.api, paciente_id)?,
        ResponsavelAction::Add { id } => {
            screen.add(&ctx.api, paciente_id, id)?;
            println!("✓ Responsável {} adicionado.", id);
        }
        ResponsavelAction::Remove { id } => {
            screen.remove(&ctx.api, paciente_id, id)?;
            println!("✓ Responsável {} removido.", id);
        }
    }

    println!("\nLista de Responsáveis");
    if let Some(empty) = screen.empty_message() {
        println!("  {}", empty);
    }
    for responsavel in screen.items() {
        println!("  • [{}] {} <{}>", responsavel.id, responsavel.nome, responsavel.email);
    }
    Ok(())
}

fn cmd_lembrete(ctx: &AppContext, once: bool) -> Result<()> {
    enter(ctx, Route::Prescricao)?;
    let view = ctx.countdown_view();

    let lines = view.snapshot(Utc::now());
    if lines.is_empty() {
        println!("Nenhuma prescrição encontrada.");
        return Ok(());
    }
    for line in &lines {
        println!("  {}", line);
    }
    if once {
        return Ok(());
    }

    println!("─────────────────────────────────────────");
    println!("Número da prescrição + Enter para marcar como tomada");
    println!("  'q' + Enter para sair");

    // Dropping the ticker at the end of this function stops the countdown
    let _ticker = view.start(ctx.config.countdown.interval(), |lines| {
        let status: Vec<String> = lines.iter().map(|l| format!("{}: {}", l.remedio, l.text)).collect();
        print!("\r{}    ", status.join(" | "));
        let _ = io::stdout().flush();
    });

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let choice = input.trim().to_lowercase();
        if choice == "q" {
            break;
        }
        if choice.is_empty() {
            continue;
        }
        match choice.parse::<i64>() {
            Ok(id) => match ctx.prescricoes.take_dose(&ctx.api, id, Utc::now()) {
                Ok(()) => println!("\n✓ Dose da prescrição {} registrada.", id),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    for alert in ctx.navigator.take_alerts() {
                        eprintln!("\n⚠ {}", alert);
                    }
                    eprintln!("  {}", e);
                }
            },
            Err(_) => eprintln!("\nOpção inválida: {}", choice),
        }
    }

    println!();
    Ok(())
}

fn print_remedio(remedio: &Remedio) {
    println!("  • [{}] {}", remedio.id, remedio.nome);
    println!("    Função:  {}", remedio.funcao);
    println!("    Dosagem: {}", remedio.dosagem);
}

fn print_prescricao(prescricao: &Prescricao) {
    println!(
        "  • [{}] {} ({})",
        prescricao.id, prescricao.remedio.nome, prescricao.remedio.dosagem
    );
    println!("    Observação:  {}", prescricao.observacao_label());
    println!("    Frequência:  {}", frequencia_label(prescricao.frequencia));
    println!(
        "    Última dose: {}",
        prescricao
            .data_inicio
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M")
    );
    if let Some(fim) = prescricao.data_fim {
        println!("    Data Fim:    {}", fim.format("%d/%m/%Y"));
    }
}
